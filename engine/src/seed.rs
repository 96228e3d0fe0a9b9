//! Default directory dataset used to reseed a wiped store.

use crate::{Employee, Entity, Municipality};

/// Role given to each region's chief.
pub const CHIEF_ROLE: &str = "Chefe Regional";

/// Role given to every other seeded employee.
pub const STAFF_ROLE: &str = "Servidor";

/// One region of the seed roster.
#[derive(Debug, Clone, Copy)]
pub struct SeedRegion {
    pub name: &'static str,
    pub chief: Option<&'static str>,
    pub staff: &'static [&'static str],
    pub municipalities: &'static [&'static str],
}

pub const DEFAULT_REGIONS: &[SeedRegion] = &[
    SeedRegion {
        name: "Regional Norte",
        chief: Some("Antônio Carlos Ribeiro"),
        staff: &["Beatriz Nogueira", "Cláudio Mendes", "Daniela Farias"],
        municipalities: &["Araguaína", "Colinas do Tocantins", "Xambioá"],
    },
    SeedRegion {
        name: "Regional Sul",
        chief: Some("Eduarda Lima"),
        staff: &["Fernando Araújo", "Gabriela Costa"],
        municipalities: &["Gurupi", "Formoso do Araguaia", "Peixe"],
    },
    SeedRegion {
        name: "Regional Centro",
        chief: Some("Heitor Barbosa"),
        staff: &["Isabela Martins", "João Pedro Alves", "Larissa Rocha"],
        municipalities: &["Palmas", "Porto Nacional", "Paraíso do Tocantins", "Miracema"],
    },
    SeedRegion {
        name: "Regional Sudeste",
        chief: None,
        staff: &["Marcelo Duarte", "Natália Pires"],
        municipalities: &["Dianópolis", "Taguatinga"],
    },
    SeedRegion {
        name: "Regional Bico do Papagaio",
        chief: Some("Otávio Cardoso"),
        staff: &["Patrícia Moura"],
        municipalities: &["Augustinópolis", "Tocantinópolis"],
    },
];

/// Employees and municipalities of the given regions, with fresh UUIDs.
pub fn dataset(regions: &[SeedRegion]) -> Vec<Entity> {
    let mut entities = Vec::new();
    for region in regions {
        if let Some(chief) = region.chief {
            entities.push(Entity::Employee(Employee {
                role: CHIEF_ROLE.to_string(),
                region: region.name.to_string(),
                ..Employee::new(chief)
            }));
        }
        for name in region.staff {
            entities.push(Entity::Employee(Employee {
                role: STAFF_ROLE.to_string(),
                region: region.name.to_string(),
                ..Employee::new(*name)
            }));
        }
        for name in region.municipalities {
            entities.push(Entity::Municipality(Municipality::new(*name, region.name)));
        }
    }
    entities
}

/// The canonical seed dataset.
pub fn default_dataset() -> Vec<Entity> {
    dataset(DEFAULT_REGIONS)
}

/// Number of employees in the canonical roster.
pub fn default_employee_count() -> usize {
    DEFAULT_REGIONS
        .iter()
        .map(|r| r.staff.len() + usize::from(r.chief.is_some()))
        .sum()
}

/// Number of municipalities in the canonical roster.
pub fn default_municipality_count() -> usize {
    DEFAULT_REGIONS.iter().map(|r| r.municipalities.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;

    #[test]
    fn dataset_matches_roster_counts() {
        let entities = default_dataset();
        let employees = entities
            .iter()
            .filter(|e| e.kind() == EntityKind::Employee)
            .count();
        assert_eq!(employees, default_employee_count());
        assert_eq!(entities.len() - employees, default_municipality_count());
    }

    #[test]
    fn chiefs_get_chief_role() {
        let entities = dataset(&DEFAULT_REGIONS[..1]);
        match &entities[0] {
            Entity::Employee(e) => {
                assert_eq!(e.name, "Antônio Carlos Ribeiro");
                assert_eq!(e.role, CHIEF_ROLE);
                assert_eq!(e.region, "Regional Norte");
                assert!(e.id.is_some());
            }
            other => panic!("expected employee, got {other:?}"),
        }
    }
}

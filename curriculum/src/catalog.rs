//! The fixed program learning outcome catalog.
//!
//! PLOs are process-wide constants; CLOs may only map to ids listed here.

use crate::types::{Plo, PloId};

const PLO_CATALOG: [(&str, &str); 7] = [
    (
        "PLO1",
        "An ability to identify, formulate, and solve complex engineering problems by applying principles of engineering, science, and mathematics.",
    ),
    (
        "PLO2",
        "An ability to apply engineering design to produce solutions that meet specified needs with consideration of public health, safety, and welfare, as well as global, cultural, social, environmental, and economic factors.",
    ),
    (
        "PLO3",
        "An ability to communicate effectively with a range of audiences.",
    ),
    (
        "PLO4",
        "An ability to recognize ethical and professional responsibilities in engineering situations and make informed judgments.",
    ),
    (
        "PLO5",
        "An ability to function effectively on a team whose members together provide leadership, create a collaborative and inclusive environment, establish goals, plan tasks, and meet objectives.",
    ),
    (
        "PLO6",
        "An ability to develop and conduct appropriate experimentation, analyze and interpret data, and use engineering judgment to draw conclusions.",
    ),
    (
        "PLO7",
        "An ability to acquire and apply new knowledge as needed, using appropriate learning strategies.",
    ),
];

/// The full catalog in display order.
pub fn plo_catalog() -> Vec<Plo> {
    PLO_CATALOG
        .iter()
        .map(|(id, description)| Plo {
            id: PloId::from(*id),
            description: description.to_string(),
        })
        .collect()
}

/// Catalog ids in display order.
pub fn plo_ids() -> impl Iterator<Item = PloId> {
    PLO_CATALOG.iter().map(|(id, _)| PloId::from(*id))
}

/// Whether `id` names a catalog PLO.
pub fn is_catalog_plo(id: &PloId) -> bool {
    PLO_CATALOG.iter().any(|(known, _)| *known == id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let catalog = plo_catalog();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog[0].id.as_str(), "PLO1");
        assert_eq!(catalog[6].id.as_str(), "PLO7");
        assert!(catalog.iter().all(|plo| !plo.description.is_empty()));
    }

    #[test]
    fn test_catalog_membership() {
        assert!(is_catalog_plo(&PloId::from("PLO3")));
        assert!(!is_catalog_plo(&PloId::from("PLO8")));
        assert!(!is_catalog_plo(&PloId::from("plo3")));
    }
}

use tracing::info;

use super::InventoryStore;
use crate::errors::ServiceError;
use crate::models::{AddBomItemRequest, CreateAssemblyRequest, CreatePartRequest, MergePartsRequest};

const DEMO_PARTS: &[(&str, i64, &str)] = &[
    ("RC0603FR-0710KL", 500, "0603"),
    ("RC0603FR-071KL", 320, "0603"),
    ("GRM188R71H104KA93D", 800, "0603"),
    ("CL10B104KB8NNNC", 150, "0603"),
    ("NE555DR", 12, "SOIC-8"),
    ("LM358DR", 0, "SOIC-8"),
];

const DEMO_BOM: &[(&str, &str, i64)] = &[
    ("RC0603FR-0710KL", "R1,R2,R3", 3),
    ("GRM188R71H104KA93D", "C1,C2", 2),
    ("NE555DR", "U1", 1),
    ("LM358DR", "U2", 1),
];

impl InventoryStore {
    /// Loads a small demo inventory: a timer board with one pair of
    /// interchangeable capacitors. Fails if any of the names already exist.
    pub async fn seed_demo(&self) -> Result<(), ServiceError> {
        let mut part_ids = Vec::with_capacity(DEMO_PARTS.len());
        for (name, quantity, package) in DEMO_PARTS {
            let part = self
                .create_part(CreatePartRequest {
                    package: Some((*package).to_string()),
                    ..CreatePartRequest::named(*name, *quantity)
                })
                .await?;
            part_ids.push(part.id);
        }

        let assembly = self
            .create_assembly(CreateAssemblyRequest {
                assembly_name: "555 Timer Board".into(),
                quantity_to_build: Some(10),
                version: Some("rev B".into()),
                ..Default::default()
            })
            .await?;
        for (part_name, reference, quantity_per) in DEMO_BOM {
            self.add_bom_item(
                assembly.id,
                AddBomItemRequest {
                    part_name: (*part_name).to_string(),
                    reference: Some((*reference).to_string()),
                    quantity_per: Some(*quantity_per),
                },
            )
            .await?;
        }

        // 100nF caps from two vendors
        self.merge_parts(MergePartsRequest {
            source_part_id: part_ids[3],
            target_part_id: part_ids[2],
            swap_assemblies: false,
        })
        .await?;

        info!(
            parts = DEMO_PARTS.len(),
            assembly_id = assembly.id,
            "Demo inventory loaded"
        );
        Ok(())
    }
}

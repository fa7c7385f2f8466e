use crate::ClasspathArgs;
use classtags_core::EntityTags;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct EntityRow {
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Tags")]
    tags: String,
}

impl From<&EntityTags> for EntityRow {
    fn from(view: &EntityTags) -> Self {
        Self {
            entity: view.entity.clone(),
            tags: view.tags.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

pub fn collect(source: &ClasspathArgs, tag: Option<&str>) -> classtags_core::Result<Vec<EntityTags>> {
    let query = source.query();
    match tag {
        // Keep every tag of the matching entities, not just the requested one
        Some(tag) => query.having_tag(tag).list_entity_tags(),
        None => query.list_entity_tags(),
    }
}

pub fn run(
    source: &ClasspathArgs,
    tag: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let views = collect(source, tag)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
    } else if views.is_empty() {
        println!("No tagged entities found.");
    } else {
        let rows: Vec<EntityRow> = views.iter().map(EntityRow::from).collect();
        println!("{}", Table::new(rows));
    }

    Ok(())
}

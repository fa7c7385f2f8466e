use crate::ClasspathArgs;
use classtags_core::query::{ResolvedEntity, TagQuery};
use classtags_java::{ClassFileResolver, ClassHandle};
use std::sync::{Arc, Mutex};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ClassRow {
    #[tabled(rename = "Class")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Origin")]
    origin: String,
}

impl From<&ClassHandle> for ClassRow {
    fn from(class: &ClassHandle) -> Self {
        let kind = if class.is_interface() {
            "interface"
        } else if class.is_abstract() {
            "abstract"
        } else {
            "class"
        };

        Self {
            name: class.name().to_string(),
            kind,
            origin: class.origin().display().to_string(),
        }
    }
}

/// Resolved classes plus the messages of those that failed to resolve.
pub struct Listing {
    pub classes: Vec<ClassHandle>,
    pub unresolved: Vec<String>,
}

pub fn collect(
    source: &ClasspathArgs,
    tag: Option<&str>,
    concrete: bool,
) -> classtags_core::Result<Listing> {
    let resolver = ClassFileResolver::from(&source.locator());

    let unresolved = Arc::new(Mutex::new(Vec::new()));
    let sink = unresolved.clone();
    let mut query: TagQuery = source.query().on_unresolved(move |e| {
        if let Ok(mut messages) = sink.lock() {
            messages.push(e.to_string());
        }
    });
    if let Some(tag) = tag {
        query = query.with_tag(tag);
    }

    let classes = if concrete {
        query.list_concrete_entities(&resolver)?
    } else {
        query.list_entities(&resolver)?
    };

    let unresolved = unresolved
        .lock()
        .map(|messages| messages.clone())
        .unwrap_or_default();
    Ok(Listing {
        classes,
        unresolved,
    })
}

pub fn run(
    source: &ClasspathArgs,
    tag: Option<&str>,
    concrete: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let listing = collect(source, tag, concrete)?;

    if listing.classes.is_empty() {
        println!("No classes resolved.");
    } else {
        let rows: Vec<ClassRow> = listing.classes.iter().map(ClassRow::from).collect();
        println!("{}", Table::new(rows));
    }

    if verbose && !listing.unresolved.is_empty() {
        eprintln!("{} entities could not be resolved:", listing.unresolved.len());
        for message in &listing.unresolved {
            eprintln!("  {}", message);
        }
    }

    Ok(())
}

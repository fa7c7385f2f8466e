use crate::ClasspathArgs;

pub fn collect(source: &ClasspathArgs, tag: &str) -> classtags_core::Result<Vec<String>> {
    source.query().with_tag(tag).list_entity_names()
}

pub fn run(source: &ClasspathArgs, tag: &str) -> Result<(), Box<dyn std::error::Error>> {
    for name in collect(source, tag)? {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_names_from_extra_fragment() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("extra.idx");
        fs::write(&path, "b.B:t.T\na.A:t.T\nc.C:t.Other\n").unwrap();

        let source = ClasspathArgs {
            fragment: vec![path],
            ..Default::default()
        };
        assert_eq!(collect(&source, "t.T").unwrap(), vec!["a.A", "b.B"]);
    }
}

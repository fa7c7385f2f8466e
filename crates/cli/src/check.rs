use classtags_core::codec::{self, DecodeStats};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub struct Report {
    pub stats: DecodeStats,
    /// Distinct entries after duplicates collapse
    pub distinct: usize,
    pub entities: usize,
    pub tags: usize,
}

pub fn inspect(path: &Path) -> classtags_core::Result<Report> {
    let file = File::open(path)?;
    let mut entries = BTreeSet::new();
    let stats = codec::decode_into(BufReader::new(file), &mut entries, None)?;

    let entities: BTreeSet<&str> = entries.iter().map(|e| e.entity()).collect();
    let tags: BTreeSet<&str> = entries.iter().map(|e| e.tag()).collect();

    Ok(Report {
        stats,
        distinct: entries.len(),
        entities: entities.len(),
        tags: tags.len(),
    })
}

pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = inspect(path)?;

    println!("File:      {}", path.display());
    println!("Lines:     {}", report.stats.lines);
    println!("Entries:   {}", report.distinct);
    println!("Entities:  {}", report.entities);
    println!("Tags:      {}", report.tags);
    println!("Skipped:   {}", report.stats.skipped);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_report_counts_skipped_lines() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("classtags.idx");
        fs::write(&path, "a.A:t.T\na.A:t.T\nb.B:t.T\ngarbage\nx:y:z\n\n").unwrap();

        let report = inspect(&path).unwrap();
        assert_eq!(report.stats.lines, 5);
        assert_eq!(report.stats.skipped, 2);
        assert_eq!(report.distinct, 2);
        assert_eq!(report.entities, 2);
        assert_eq!(report.tags, 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        assert!(inspect(&temp.path().join("absent.idx")).is_err());
    }
}

use crate::model::{BackupFile, VersionRecord};

/// Order a group's files into versions: oldest first, V1 = oldest.
///
/// Equal creation timestamps fall back to lexical path order, so the same set
/// of files always produces the same numbering. Change counts are left for
/// the diff pass.
pub fn rank(mut files: Vec<BackupFile>) -> Vec<VersionRecord> {
    files.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.path.cmp(&b.path))
    });

    files
        .into_iter()
        .enumerate()
        .map(|(i, file)| VersionRecord {
            file,
            version: i + 1,
            changed_lines: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::PathBuf;

    fn file(name: &str, minutes: i64) -> BackupFile {
        BackupFile {
            path: PathBuf::from("/b").join(name),
            base_name: "doc".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
                + Duration::minutes(minutes),
            total_lines: 1,
        }
    }

    #[test]
    fn versions_follow_creation_time() {
        let ranked = rank(vec![
            file("doc.bak.2", 10),
            file("doc.bak", 0),
            file("doc.bak.1", 5),
        ]);

        let order: Vec<(usize, &str)> = ranked
            .iter()
            .map(|r| (r.version, r.file.path.file_name().unwrap().to_str().unwrap()))
            .collect();
        assert_eq!(
            order,
            vec![(1, "doc.bak"), (2, "doc.bak.1"), (3, "doc.bak.2")]
        );
        assert!(ranked.iter().all(|r| r.changed_lines.is_none()));
    }

    #[test]
    fn contiguous_and_strictly_increasing() {
        let files: Vec<BackupFile> = (0..20)
            .map(|i| file(&format!("doc.bak.{}", i), (i * 7919) % 101))
            .collect();
        let ranked = rank(files);

        for (i, pair) in ranked.windows(2).enumerate() {
            assert_eq!(pair[0].version, i + 1);
            assert_eq!(pair[1].version, i + 2);
            assert!(pair[0].file.created_at < pair[1].file.created_at);
        }
    }

    #[test]
    fn ties_break_on_path() {
        let ranked = rank(vec![file("doc_b.bak", 0), file("doc_a.bak", 0)]);
        assert_eq!(ranked[0].file.path, PathBuf::from("/b/doc_a.bak"));
        assert_eq!(ranked[1].file.path, PathBuf::from("/b/doc_b.bak"));
    }

    #[test]
    fn empty_group() {
        assert!(rank(Vec::new()).is_empty());
    }
}

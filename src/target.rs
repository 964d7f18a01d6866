use crate::error::BackupError;

const TARGET_SEPARATOR: char = ',';
const PATH_SEPARATOR: char = ':';

/// One local directory mirrored to one remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupItem {
    pub source: String,
    pub destination: String,
}

/// Parses `src1:dest1,src2:dest2,...` into items, preserving order.
///
/// Only the first `:` of a segment splits source from destination, so the
/// destination may contain further colons. Both sides must be non-empty: an
/// empty destination would mirror into the remote root. Paths are not
/// normalized or checked.
pub fn parse_targets(raw: &str) -> Result<Vec<BackupItem>, BackupError> {
    if raw.trim().is_empty() {
        return Err(BackupError::InvalidConfig("no targets specified".into()));
    }

    raw.split(TARGET_SEPARATOR)
        .map(|segment| match segment.split_once(PATH_SEPARATOR) {
            Some((source, destination)) if !source.is_empty() && !destination.is_empty() => {
                Ok(BackupItem {
                    source: source.to_string(),
                    destination: destination.to_string(),
                })
            }
            _ => Err(BackupError::InvalidConfig(format!(
                "malformed target \"{segment}\""
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, destination: &str) -> BackupItem {
        BackupItem {
            source: source.into(),
            destination: destination.into(),
        }
    }

    fn message(err: BackupError) -> String {
        match err {
            BackupError::InvalidConfig(msg) => msg,
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn parses_targets_in_order() {
        let items = parse_targets("path1:dest1,path2:dest2").unwrap();
        assert_eq!(items, vec![item("path1", "dest1"), item("path2", "dest2")]);
    }

    #[test]
    fn keeps_order_for_many_targets() {
        let raw = (1..=5)
            .map(|i| format!("/src/{i}:dst/{i}"))
            .collect::<Vec<_>>()
            .join(",");
        let items = parse_targets(&raw).unwrap();
        assert_eq!(items.len(), 5);
        for (i, it) in items.iter().enumerate() {
            assert_eq!(it.source, format!("/src/{}", i + 1));
            assert_eq!(it.destination, format!("dst/{}", i + 1));
        }
    }

    #[test]
    fn empty_string_has_no_targets() {
        assert_eq!(message(parse_targets("").unwrap_err()), "no targets specified");
        assert_eq!(
            message(parse_targets("   ").unwrap_err()),
            "no targets specified"
        );
    }

    #[test]
    fn segment_without_colon_is_malformed() {
        assert_eq!(
            message(parse_targets("invalid_format").unwrap_err()),
            "malformed target \"invalid_format\""
        );
    }

    #[test]
    fn splits_on_first_colon_only() {
        assert_eq!(parse_targets("a:b:c").unwrap(), vec![item("a", "b:c")]);
    }

    #[test]
    fn empty_destination_is_malformed() {
        assert_eq!(
            message(parse_targets("/a:x,/b:").unwrap_err()),
            "malformed target \"/b:\""
        );
        assert!(parse_targets("/home/me:").is_err());
    }

    #[test]
    fn empty_source_is_malformed() {
        assert!(parse_targets(":dest").is_err());
    }

    #[test]
    fn trailing_separator_is_malformed() {
        assert_eq!(
            message(parse_targets("a:b,").unwrap_err()),
            "malformed target \"\""
        );
    }

    #[test]
    fn paths_are_not_normalized() {
        let items = parse_targets(" ./docs/../docs : Backups/docs").unwrap();
        assert_eq!(items, vec![item(" ./docs/../docs ", " Backups/docs")]);
    }

    #[test]
    fn duplicates_are_kept() {
        assert_eq!(parse_targets("a:b,a:b").unwrap().len(), 2);
    }
}

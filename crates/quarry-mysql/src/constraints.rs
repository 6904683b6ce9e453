use quarry_core::schema::ForeignKey;

use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static FOREIGN_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)(?:CONSTRAINT\s+`?([^`\s]+)`?\s+)?FOREIGN KEY\s+\(([^\)]+)\)\s+REFERENCES\s+([^\(\s]+)\s*\(([^\)]+)\)",
    )
    .unwrap()
});

static UNIQUE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)UNIQUE KEY\s+([^\(\s]+)\s*\(([^\(\)]+)\)").unwrap());

/// Foreign keys declared in a `SHOW CREATE TABLE` statement.
pub(crate) fn foreign_keys(create_table: &str) -> Vec<ForeignKey> {
    FOREIGN_KEY
        .captures_iter(create_table)
        .map(|caps| {
            let local = column_list(&caps[2]);
            let foreign = column_list(&caps[4]);

            ForeignKey {
                name: caps.get(1).map(|m| m.as_str().to_string()),
                table: caps[3].replace('`', ""),
                columns: local.into_iter().zip(foreign).collect(),
            }
        })
        .collect()
}

/// Unique indexes declared in a `SHOW CREATE TABLE` statement, keyed by
/// index name.
pub(crate) fn unique_indexes(create_table: &str) -> IndexMap<String, Vec<String>> {
    UNIQUE_KEY
        .captures_iter(create_table)
        .map(|caps| (caps[1].replace('`', ""), column_list(&caps[2])))
        .collect()
}

fn column_list(list: &str) -> Vec<String> {
    list.replace('`', "")
        .split(',')
        .map(|column| column.trim().to_string())
        .collect()
}

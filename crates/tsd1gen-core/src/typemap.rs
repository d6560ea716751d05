use std::collections::BTreeMap;

use crate::ir::{Column, TypeOverride};

/// Type of a column whose database type has no mapping.
pub const FALLBACK_TS_TYPE: &str = "number | string";

// https://developers.cloudflare.com/d1/platform/client-api/#type-conversion
const D1_DEFAULTS: &[(&str, &str)] = &[
    ("NULL", "null"),
    ("REAL", "number"),
    ("INTEGER", "number"),
    ("TEXT", "string"),
    ("DATETIME", "string"),
    ("JSON", "string"),
    ("BLOB", "ArrayBuffer"),
];

/// Database type name -> TypeScript type, keyed by upper-cased type name.
#[derive(Debug, Clone)]
pub struct TypeMap {
    types: BTreeMap<String, String>,
}

impl TypeMap {
    pub fn new(overrides: &[TypeOverride]) -> Self {
        let mut types: BTreeMap<String, String> = D1_DEFAULTS
            .iter()
            .map(|(db, ts)| (db.to_string(), ts.to_string()))
            .collect();
        for o in overrides {
            types.insert(o.db_type.to_uppercase(), o.code_type.clone());
        }
        TypeMap { types }
    }

    pub fn is_known(&self, db_type: &str) -> bool {
        self.types.contains_key(&db_type.to_uppercase())
    }

    fn scalar(&self, db_type: &str) -> &str {
        self.types
            .get(&db_type.to_uppercase())
            .map(String::as_str)
            .unwrap_or(FALLBACK_TS_TYPE)
    }

    /// Element type, then `[]` for slices, then `| null` for nullable columns.
    pub fn resolve(&self, column: &Column) -> String {
        let mut ts = self.scalar(&column.db_type).to_string();
        if column.is_slice {
            ts.push_str("[]");
        }
        if !column.not_null {
            ts.push_str(" | null");
        }
        ts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(db_type: &str, not_null: bool, is_slice: bool) -> Column {
        Column {
            name: "c".to_string(),
            db_type: db_type.to_string(),
            not_null,
            is_slice,
            ..Column::default()
        }
    }

    #[test]
    fn defaults_are_case_insensitive() {
        let m = TypeMap::new(&[]);
        assert_eq!(m.resolve(&col("integer", true, false)), "number");
        assert_eq!(m.resolve(&col("Text", true, false)), "string");
        assert_eq!(m.resolve(&col("BLOB", false, false)), "ArrayBuffer | null");
    }

    #[test]
    fn unknown_type_falls_back() {
        let m = TypeMap::new(&[]);
        assert!(!m.is_known("uuid"));
        assert_eq!(m.resolve(&col("uuid", true, false)), "number | string");
        assert_eq!(
            m.resolve(&col("uuid", false, false)),
            "number | string | null"
        );
    }

    #[test]
    fn slice_suffix_precedes_null_suffix() {
        let m = TypeMap::new(&[]);
        assert_eq!(m.resolve(&col("INTEGER", true, true)), "number[]");
        assert_eq!(m.resolve(&col("INTEGER", false, true)), "number[] | null");
    }

    #[test]
    fn overrides_win() {
        let m = TypeMap::new(&[
            TypeOverride {
                db_type: "integer".to_string(),
                code_type: "bigint".to_string(),
            },
            TypeOverride {
                db_type: "uuid".to_string(),
                code_type: "string".to_string(),
            },
        ]);
        assert_eq!(m.resolve(&col("INTEGER", true, false)), "bigint");
        assert_eq!(m.resolve(&col("UUID", true, false)), "string");
        assert!(m.is_known("Uuid"));
    }
}

use std::collections::BTreeMap;

use crate::ir::{Catalog, Column, Identifier, Table};

#[derive(Debug)]
struct TableEntry<'a> {
    table: &'a Table,
    columns: BTreeMap<&'a str, &'a Column>,
}

/// Lookup of catalog tables by name and of their columns by name.
///
/// Tables are keyed by bare name across all schemas; a later schema shadows an
/// earlier table of the same name.
#[derive(Debug, Default)]
pub struct SchemaIndex<'a> {
    tables: BTreeMap<&'a str, TableEntry<'a>>,
}

impl<'a> SchemaIndex<'a> {
    pub fn build(catalog: &'a Catalog) -> Self {
        let mut tables = BTreeMap::new();
        for schema in &catalog.schemas {
            for table in &schema.tables {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| (c.name.as_str(), c))
                    .collect();
                tables.insert(table.rel.name.as_str(), TableEntry { table, columns });
            }
        }
        SchemaIndex { tables }
    }

    pub fn find_table(&self, table: &Identifier) -> Option<&'a Table> {
        self.tables.get(table.name.as_str()).map(|e| e.table)
    }

    /// The schema declaration of a column that carries a table back-reference.
    pub fn find_column(&self, column: &Column) -> Option<&'a Column> {
        let table = column.table.as_ref()?;
        let entry = self.tables.get(table.name.as_str())?;
        entry.columns.get(column.name.as_str()).copied()
    }

    /// True when `column` claims not-null but its schema declaration is nullable.
    pub fn widens_to_nullable(&self, column: &Column) -> bool {
        column.not_null && self.find_column(column).is_some_and(|c| !c.not_null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Schema;

    fn column(name: &str, not_null: bool) -> Column {
        Column {
            name: name.to_string(),
            db_type: "TEXT".to_string(),
            not_null,
            ..Column::default()
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            schemas: vec![Schema {
                name: "main".to_string(),
                tables: vec![Table {
                    rel: Identifier::new("users"),
                    columns: vec![column("id", true), column("email", false)],
                }],
            }],
        }
    }

    #[test]
    fn finds_tables_and_columns() {
        let catalog = catalog();
        let index = SchemaIndex::build(&catalog);
        assert_eq!(
            index.find_table(&Identifier::new("users")).map(|t| t.columns.len()),
            Some(2)
        );
        assert!(index.find_table(&Identifier::new("posts")).is_none());

        let mut param = column("email", true);
        param.table = Some(Identifier::new("users"));
        assert_eq!(index.find_column(&param).map(|c| c.not_null), Some(false));
        assert!(index.widens_to_nullable(&param));
    }

    #[test]
    fn missing_lookups_do_not_widen() {
        let catalog = catalog();
        let index = SchemaIndex::build(&catalog);

        let no_table = column("email", true);
        assert!(index.find_column(&no_table).is_none());
        assert!(!index.widens_to_nullable(&no_table));

        let mut unknown_table = column("email", true);
        unknown_table.table = Some(Identifier::new("posts"));
        assert!(!index.widens_to_nullable(&unknown_table));

        let mut unknown_column = column("nickname", true);
        unknown_column.table = Some(Identifier::new("users"));
        assert!(!index.widens_to_nullable(&unknown_column));

        let mut not_null_in_schema = column("id", true);
        not_null_in_schema.table = Some(Identifier::new("users"));
        assert!(!index.widens_to_nullable(&not_null_in_schema));
    }
}

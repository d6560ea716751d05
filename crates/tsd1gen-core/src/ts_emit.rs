use std::collections::BTreeSet;

use crate::ir::Catalog;
use crate::naming;
use crate::options::Options;
use crate::shape::{Field, FieldMapping, Primitive, QueryPlan, TypeDecl};
use crate::slice::EXPANDED_PARAM_HELPER;
use crate::typemap::TypeMap;

const QUERY_TYPE_DECL: &str = "type Query<T> = {
  then(onFulfilled?: (value: T) => void, onRejected?: (reason?: any) => void): void;
  batch(): D1PreparedStatement;
}
";

#[derive(Debug, Default)]
struct TsWriter {
    out: String,
    indent: usize,
}

impl TsWriter {
    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Appends pre-formatted text verbatim.
    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn open(&mut self, s: &str) {
        self.line(s);
        self.indent += 1;
    }

    fn close(&mut self, s: &str) {
        self.indent = self.indent.saturating_sub(1);
        self.line(s);
    }

    fn finish(self) -> String {
        self.out
    }
}

/// `models.ts`: one exported type per catalog table, in catalog order.
pub fn emit_models(catalog: &Catalog, type_map: &TypeMap, banner: &str) -> String {
    let mut w = TsWriter::default();
    w.raw(banner);
    w.blank();
    for schema in &catalog.schemas {
        for table in &schema.tables {
            let decl = TypeDecl {
                name: naming::model_type_name(&table.rel),
                exported: true,
                fields: table
                    .columns
                    .iter()
                    .map(|c| Field {
                        name: naming::property_name(c),
                        ts_type: type_map.resolve(c),
                    })
                    .collect(),
            };
            type_decl(&mut w, &decl);
        }
    }
    w.finish()
}

/// `querier.ts`: imports, then per query its constant, types and function.
pub fn emit_querier(plans: &[QueryPlan<'_>], options: &Options, banner: &str) -> String {
    let mut w = TsWriter::default();
    w.raw(banner);
    w.blank();

    let models: BTreeSet<&str> = plans
        .iter()
        .flat_map(|p| p.shape.models.iter().map(String::as_str))
        .collect();
    let mut imports = false;
    if !options.workers_types_v3 {
        w.line(&format!(
            "import {{ D1Database, D1PreparedStatement, D1Result }} from \"{}\"",
            options.workers_types_package()
        ));
        imports = true;
    }
    if !models.is_empty() {
        let names: Vec<&str> = models.into_iter().collect();
        w.line(&format!("import {{ {} }} from \"./models\"", names.join(", ")));
        imports = true;
    }
    if imports {
        w.blank();
    }

    w.raw(QUERY_TYPE_DECL);
    w.blank();

    for plan in plans {
        query_const(&mut w, plan);
        let shape = &plan.shape;
        for decl in [&shape.params, &shape.row, &shape.raw_row].into_iter().flatten() {
            type_decl(&mut w, decl);
        }
        function(&mut w, plan, options);
    }

    if plans.iter().any(|p| p.slices.is_some()) {
        w.raw(EXPANDED_PARAM_HELPER);
    }
    w.finish()
}

fn type_decl(w: &mut TsWriter, decl: &TypeDecl) {
    let keyword = if decl.exported { "export type" } else { "type" };
    w.open(&format!("{keyword} {} = {{", decl.name));
    for f in &decl.fields {
        w.line(&format!("{}: {};", f.name, f.ts_type));
    }
    w.close("};");
    w.blank();
}

fn query_const(w: &mut TsWriter, plan: &QueryPlan<'_>) {
    let q = plan.query;
    w.raw(&format!(
        "const {} = `-- name: {} {}\n{}`;\n",
        plan.const_name,
        q.name,
        q.cmd.as_str(),
        template_literal_body(&plan.text)
    ));
    w.blank();
}

fn function(w: &mut TsWriter, plan: &QueryPlan<'_>, options: &Options) {
    let shape = &plan.shape;

    w.open(&format!("export function {}(", plan.function_name));
    match &shape.params {
        Some(params) => {
            w.line("d1: D1Database,");
            w.line(&format!("args: {}", params.name));
        }
        None => w.line("d1: D1Database"),
    }
    w.indent -= 1;
    w.open(&format!("): Query<{}> {{", shape.return_type));

    let (query_var, bind) = match &plan.slices {
        Some(slices) => {
            w.line(&format!("let query = {};", plan.const_name));
            w.line(&format!(
                "const params: any[] = [{}];",
                slices.seed_args.join(", ")
            ));
            for e in &slices.expansions {
                w.line(&format!(
                    "query = query.replace({}, expandedParam({}, args.{}.length, params.length));",
                    js_string(&e.marker),
                    e.number,
                    e.prop
                ));
                w.line(&format!("params.push(...args.{}.slice(1));", e.prop));
            }
            ("query".to_string(), "...params".to_string())
        }
        None => (plan.const_name.clone(), plan.bind_args.join(", ")),
    };

    w.line("const ps = d1");
    w.indent += 1;
    if plan.bind_args.is_empty() {
        w.line(&format!(".prepare({query_var});"));
    } else {
        w.line(&format!(".prepare({query_var})"));
        w.line(&format!(".bind({bind});"));
    }
    w.indent -= 1;

    w.open("return {");
    w.open(&format!(
        "then(onFulfilled?: (value: {}) => void, onRejected?: (reason?: any) => void) {{",
        shape.return_type
    ));
    match &shape.primitive {
        Primitive::First { result } => w.line(&format!("ps.first<{result}>()")),
        Primitive::All { result } => w.line(&format!("ps.all<{result}>()")),
        Primitive::Run => w.line("ps.run()"),
    }
    w.indent += 1;
    if shape.needs_raw() {
        from_raw(w, &shape.primitive, &shape.mapping, options);
    }
    w.line(".then(onFulfilled).catch(onRejected);");
    w.indent -= 1;
    w.close("},");
    w.line("batch() { return ps; },");
    w.close("}");
    w.close("}");
    w.blank();
}

/// The `.then(...)` step that turns raw rows into public rows.
fn from_raw(w: &mut TsWriter, primitive: &Primitive, mapping: &[FieldMapping], options: &Options) {
    match primitive {
        Primitive::First { result } => {
            w.open(&format!(".then((raw: {result}) => raw ? {{"));
            mapping_fields(w, mapping);
            w.close("} : null)");
        }
        Primitive::All { result } => {
            w.open(&format!(".then((r: D1Result<{result}>) => {{ return {{"));
            w.line("...r,");
            if options.workers_types_v3 {
                w.open(&format!(
                    "results: r.results ? r.results.map((raw: {result}) => {{ return {{"
                ));
                mapping_fields(w, mapping);
                w.close("}}) : undefined,");
            } else {
                w.open(&format!("results: r.results.map((raw: {result}) => {{ return {{"));
                mapping_fields(w, mapping);
                w.close("}}),");
            }
            w.close("}})");
        }
        Primitive::Run => {}
    }
}

fn mapping_fields(w: &mut TsWriter, mapping: &[FieldMapping]) {
    for m in mapping {
        match m {
            FieldMapping::Scalar { prop, raw } => w.line(&format!("{prop}: raw.{raw},")),
            FieldMapping::Embed { prop, fields } => {
                w.line(&format!("// sqlc.embed({prop})"));
                w.open(&format!("{prop}: {{"));
                for (to, from) in fields {
                    w.line(&format!("{to}: raw.{from},"));
                }
                w.close("},");
            }
        }
    }
}

/// Escapes text for use inside a TypeScript template literal.
fn template_literal_body(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn js_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_blocks() {
        let mut w = TsWriter::default();
        w.open("a {");
        w.open("b {");
        w.line("c;");
        w.close("}");
        w.close("}");
        assert_eq!(w.finish(), "a {\n  b {\n    c;\n  }\n}\n");
    }

    #[test]
    fn empty_type_has_balanced_braces() {
        let mut w = TsWriter::default();
        type_decl(
            &mut w,
            &TypeDecl {
                name: "Empty".to_string(),
                exported: true,
                fields: Vec::new(),
            },
        );
        assert_eq!(w.finish(), "export type Empty = {\n};\n\n");
    }

    #[test]
    fn template_literal_escaping() {
        assert_eq!(
            template_literal_body("SELECT `a` FROM t WHERE b = '${x}' AND c = '\\'"),
            "SELECT \\`a\\` FROM t WHERE b = '\\${x}' AND c = '\\\\'"
        );
        assert_eq!(template_literal_body("SELECT $1"), "SELECT $1");
    }

    #[test]
    fn js_string_quotes() {
        assert_eq!(js_string("(/*SLICE:ids*/?)"), "\"(/*SLICE:ids*/?)\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
    }
}

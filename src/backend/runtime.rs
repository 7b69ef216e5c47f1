//! Names of the runtime-library entry points the emitted code calls.

use strum::{Display, EnumIter, IntoEnumIterator};

use super::js::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum RuntimeEntry {
    Print,
    Stringify,
    MapBuilder,
    MapToString,
    ListToString,
}

/// Dotted paths for each [`RuntimeEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLibrary {
    pub print: String,
    pub stringify: String,
    pub map_builder: String,
    pub map_to_string: String,
    pub list_to_string: String,
}

impl Default for RuntimeLibrary {
    fn default() -> Self {
        Self {
            print: "P.print".to_string(),
            stringify: "H.S".to_string(),
            map_builder: "P.LinkedHashMap__makeLiteral".to_string(),
            map_to_string: "P.Maps_mapToString".to_string(),
            list_to_string: "H.S".to_string(),
        }
    }
}

impl RuntimeLibrary {
    pub fn path(&self, entry: RuntimeEntry) -> &str {
        match entry {
            RuntimeEntry::Print => &self.print,
            RuntimeEntry::Stringify => &self.stringify,
            RuntimeEntry::MapBuilder => &self.map_builder,
            RuntimeEntry::MapToString => &self.map_to_string,
            RuntimeEntry::ListToString => &self.list_to_string,
        }
    }

    pub fn set_path(&mut self, entry: RuntimeEntry, path: impl Into<String>) {
        let slot = match entry {
            RuntimeEntry::Print => &mut self.print,
            RuntimeEntry::Stringify => &mut self.stringify,
            RuntimeEntry::MapBuilder => &mut self.map_builder,
            RuntimeEntry::MapToString => &mut self.map_to_string,
            RuntimeEntry::ListToString => &mut self.list_to_string,
        };

        *slot = path.into();
    }

    pub fn call(&self, entry: RuntimeEntry, arguments: Vec<Expression>) -> Expression {
        Expression::call(Expression::path(self.path(entry)), arguments)
    }

    /// Top-level names the entry points live under, which emitted locals must
    /// not shadow.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        RuntimeEntry::iter().filter_map(|entry| self.path(entry).split('.').next())
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::{RuntimeEntry, RuntimeLibrary};
    use crate::backend::js::{Expression, Program, Statement, pretty_print::print_program};

    #[test]
    fn calls_render_as_dotted_paths() {
        let runtime = RuntimeLibrary::default();
        let program = Program {
            body: vec![Statement::Expression(
                runtime.call(RuntimeEntry::MapBuilder, vec![Expression::Array(vec![])]),
            )],
        };

        assert_eq!(
            print_program(&program),
            "function() {\n  P.LinkedHashMap__makeLiteral([]);\n}\n"
        );
    }

    #[test]
    fn overrides_change_namespaces() {
        let mut runtime = RuntimeLibrary::default();

        assert_eq!(runtime.namespaces().unique().collect::<Vec<_>>(), ["P", "H"]);

        runtime.set_path(RuntimeEntry::Print, "console.log");

        assert_eq!(runtime.path(RuntimeEntry::Print), "console.log");
        assert!(runtime.namespaces().any(|namespace| namespace == "console"));
        assert_eq!(RuntimeEntry::ListToString.to_string(), "listToString");
    }
}

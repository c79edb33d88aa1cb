//! Entry points tying expansion, rendering, DDL and migration together.

use crate::config::CompilerConfig;
use crate::ddl::DdlGenerator;
use crate::error::Result;
use crate::expand::{ExpandedObject, Expander};
use crate::migration::{plan_migration, TableInspector};
use crate::render;
use crate::schema::{DefinitionDocument, LanguageMode, ObjectDefinition};

/// The language codeset itself never gets translation tables.
const LANGUAGE_CODESET: &str = "language";

/// Result of expanding one identifier.
#[derive(Debug, Clone)]
pub struct CompiledDefinition {
    pub tree: ExpandedObject,
    /// Compact `{"<identifier>": <object>}` text.
    pub canonical: String,
    pub pretty: String,
}

#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Compiler { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn generator(&self) -> DdlGenerator {
        DdlGenerator::new(self.config.dialect).with_layout(self.config.layout.clone())
    }

    fn expander(&self, def: &ObjectDefinition, multi_language: bool) -> Expander {
        let enabled = multi_language
            && def.identifier != LANGUAGE_CODESET
            && def.language != LanguageMode::Single;
        Expander::new(enabled).with_legacy_ordinal_index(self.config.legacy_ordinal_index)
    }

    /// Expand `identifier` from `document`.
    pub fn expand(
        &self,
        document: &DefinitionDocument,
        identifier: &str,
    ) -> Result<CompiledDefinition> {
        let def = document.definition(identifier)?;
        let tree = self.expander(&def, self.config.multi_language).expand(&def)?;
        log::debug!(
            "expanded {identifier}: {} table(s)",
            tree.tables().len()
        );
        Ok(CompiledDefinition {
            canonical: render::canonical(identifier, &tree),
            pretty: render::pretty(identifier, &tree, &self.config.pretty),
            tree,
        })
    }

    /// DDL for a document that already holds expanded output.
    pub fn create_statements(
        &self,
        document: &DefinitionDocument,
        identifier: &str,
    ) -> Result<Vec<String>> {
        let def = document.definition(identifier)?;
        // Expanded output is a fixed point without translation relocation.
        let tree = self.expander(&def, false).expand(&def)?;
        Ok(self.generator().create_statements(&tree))
    }

    /// Expansion followed by DDL for the expanded tree.
    pub fn expand_to_sql(
        &self,
        document: &DefinitionDocument,
        identifier: &str,
    ) -> Result<(CompiledDefinition, Vec<String>)> {
        let compiled = self.expand(document, identifier)?;
        let statements = self.generator().create_statements(&compiled.tree);
        Ok((compiled, statements))
    }

    /// Statements bringing the live tables reported by `inspector` up to
    /// the expanded definition of `identifier`.
    pub fn migration_statements(
        &self,
        document: &DefinitionDocument,
        identifier: &str,
        inspector: &dyn TableInspector,
    ) -> Result<Vec<String>> {
        let compiled = self.expand(document, identifier)?;
        Ok(plan_migration(&compiled.tree, &self.generator(), inspector))
    }
}

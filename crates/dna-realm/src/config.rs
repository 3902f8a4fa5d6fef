//! Realm configuration

/// Document-wide realm options
#[derive(Debug, Clone)]
pub struct Config {
    /// Serve `previousSibling`/`nextSibling` from the logical list when walking
    /// staged nodes
    pub virtual_iterator: bool,

    /// Let a realm take a node out of an unrelated realm on insertion. When
    /// disabled such an insertion is an ownership violation.
    pub allow_cross_realm_moves: bool,

    /// Trace the serialized logical children after every notification
    pub log_mutations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            virtual_iterator: true,
            allow_cross_realm_moves: true,
            log_mutations: false,
        }
    }
}

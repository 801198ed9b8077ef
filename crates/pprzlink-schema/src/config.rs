/// Controls schema document loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaConfig {
    /// Maximum bytes allowed for a schema document read from disk.
    pub max_schema_file_size: usize,
    /// When true, schema documents reached through a symlink are refused.
    pub reject_symlinks: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            max_schema_file_size: 4 * 1024 * 1024,
            reject_symlinks: true,
        }
    }
}

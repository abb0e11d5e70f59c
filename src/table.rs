//! Columnar data blocks.
//!
//! Volume server payloads are BinaryCIF: blocks of named categories, each a
//! table of typed columns. Decoding the wire format is left to an external
//! decoder; the pipeline only needs typed column access by name, expressed
//! by [`DataBlock`] and [`Category`]. [`TableBlock`] is an owned in-memory
//! implementation.

/// One category (table) of a data block.
pub trait Category: Send + Sync {
    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Field (column) names in declaration order.
    fn field_names(&self) -> Vec<&str>;

    /// A field decoded as integers, if present and integral.
    fn int_column(&self, field: &str) -> Option<Vec<i32>>;

    /// Up to `limit` values of a field rendered as strings.
    fn preview(&self, field: &str, limit: usize) -> Vec<String>;
}

/// A named block of categories.
pub trait DataBlock: Send + Sync {
    /// Block header (e.g. `SEGMENTATION_DATA`).
    fn header(&self) -> &str;

    /// Category names in declaration order.
    fn category_names(&self) -> Vec<&str>;

    /// Look up a category by name.
    fn category(&self, name: &str) -> Option<&dyn Category>;
}

/// Typed column storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Integer column.
    Int(Vec<i32>),
    /// Floating point column.
    Float(Vec<f64>),
    /// String column.
    Str(Vec<String>),
}

impl Column {
    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Int(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Str(v) => v.len(),
        }
    }

    /// Whether the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`Category`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCategory {
    fields: Vec<(String, Column)>,
}

impl TableCategory {
    /// Empty category.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a field.
    #[must_use]
    pub fn with_field(mut self, name: &str, column: Column) -> Self {
        self.fields.retain(|(n, _)| n != name);
        self.fields.push((name.to_owned(), column));
        self
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }
}

impl Category for TableCategory {
    fn row_count(&self) -> usize {
        self.fields.iter().map(|(_, c)| c.len()).max().unwrap_or(0)
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn int_column(&self, field: &str) -> Option<Vec<i32>> {
        match self.column(field)? {
            Column::Int(v) => Some(v.clone()),
            Column::Float(v) => v
                .iter()
                .map(|&x| (x.fract() == 0.0).then_some(x as i32))
                .collect(),
            Column::Str(v) => v.iter().map(|s| s.trim().parse().ok()).collect(),
        }
    }

    fn preview(&self, field: &str, limit: usize) -> Vec<String> {
        match self.column(field) {
            Some(Column::Int(v)) => {
                v.iter().take(limit).map(ToString::to_string).collect()
            }
            Some(Column::Float(v)) => {
                v.iter().take(limit).map(ToString::to_string).collect()
            }
            Some(Column::Str(v)) => v.iter().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }
}

/// In-memory [`DataBlock`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    header: String,
    categories: Vec<(String, TableCategory)>,
}

impl TableBlock {
    /// Empty block with a header.
    #[must_use]
    pub fn new(header: &str) -> Self {
        Self {
            header: header.to_owned(),
            categories: Vec::new(),
        }
    }

    /// Add (or replace) a category.
    #[must_use]
    pub fn with_category(mut self, name: &str, category: TableCategory) -> Self {
        self.categories.retain(|(n, _)| n != name);
        self.categories.push((name.to_owned(), category));
        self
    }
}

impl DataBlock for TableBlock {
    fn header(&self) -> &str {
        &self.header
    }

    fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|(n, _)| n.as_str()).collect()
    }

    fn category(&self, name: &str) -> Option<&dyn Category> {
        self.categories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| -> &dyn Category { c })
    }
}

/// Find a block by header.
#[must_use]
pub fn find_block<'a>(
    blocks: &'a [Box<dyn DataBlock>],
    header: &str,
) -> Option<&'a dyn DataBlock> {
    blocks
        .iter()
        .find(|b| b.header() == header)
        .map(|b| &**b)
}

/// Log every block's categories, row counts and leading field values.
pub fn log_block_overview(name: &str, blocks: &[Box<dyn DataBlock>]) {
    const MAX_VALUES: usize = 5;
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("payload {name}:");
    for block in blocks {
        log::debug!("    {}", block.header());
        for cat_name in block.category_names() {
            let Some(category) = block.category(cat_name) else {
                continue;
            };
            let rows = category.row_count();
            log::debug!("        _{cat_name} [{rows} rows]");
            for field in category.field_names() {
                let mut values = category.preview(field, MAX_VALUES).join(", ");
                if rows > MAX_VALUES {
                    values.push_str("...");
                }
                log::debug!("            .{field}:  {values}");
            }
        }
    }
}

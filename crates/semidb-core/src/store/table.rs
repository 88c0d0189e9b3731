use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("table has no header row")]
    MissingHeader,
    #[error("unterminated quoted field starting on line {line}")]
    UnterminatedQuote { line: usize },
    #[error("line {line} has {found} fields, header has {expected}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("missing required column '{column}'")]
    MissingColumn { column: String },
    #[error("line {line}: column '{column}' value '{value}' is not a number")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: column '{column}' value '{value}' is not a valid label")]
    InvalidLabel {
        line: usize,
        column: String,
        value: String,
    },
    #[error("expected exactly two composition columns (x_A, x_B), found {found}")]
    CompositionColumns { found: usize },
}

/// A comma-separated table held as trimmed text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<TableRow>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub line: usize,
    pub cells: Vec<String>,
}

impl Table {
    pub fn parse(source: &str) -> Result<Self, TableError> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mut records = split_records(source)?.into_iter();
        let (_, header) = records.next().ok_or(TableError::MissingHeader)?;

        let mut rows = Vec::new();
        for (line, cells) in records {
            if cells.len() != header.len() {
                return Err(TableError::FieldCount {
                    line,
                    expected: header.len(),
                    found: cells.len(),
                });
            }
            rows.push(TableRow { line, cells });
        }

        let index = header
            .iter()
            .enumerate()
            .map(|(position, name)| (name.clone(), position))
            .collect();

        Ok(Self {
            header,
            rows,
            index,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves the first of `aliases` present in the header.
    pub fn column(&self, aliases: &[&str]) -> Result<Column, TableError> {
        self.optional_column(aliases)
            .ok_or_else(|| TableError::MissingColumn {
                column: aliases.first().copied().unwrap_or_default().to_string(),
            })
    }

    pub fn optional_column(&self, aliases: &[&str]) -> Option<Column> {
        aliases.iter().find_map(|alias| {
            self.index.get(*alias).map(|position| Column {
                position: *position,
                name: (*alias).to_string(),
            })
        })
    }

    pub fn columns_with_prefix(&self, prefix: &str) -> Vec<Column> {
        self.header
            .iter()
            .enumerate()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(position, name)| Column {
                position,
                name: name.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub position: usize,
    pub name: String,
}

impl TableRow {
    pub fn text(&self, column: &Column) -> &str {
        &self.cells[column.position]
    }

    /// An empty cell is a missing value and reads as NaN.
    pub fn float(&self, column: &Column) -> Result<f64, TableError> {
        let value = self.text(column);
        if value.is_empty() {
            return Ok(f64::NAN);
        }
        value.parse::<f64>().map_err(|_| self.invalid(column, value))
    }

    /// An empty cell is a missing count.
    pub fn optional_unsigned(&self, column: &Column) -> Result<Option<u32>, TableError> {
        if self.text(column).is_empty() {
            return Ok(None);
        }
        self.unsigned(column).map(Some)
    }

    pub fn unsigned(&self, column: &Column) -> Result<u32, TableError> {
        let value = self.text(column);
        if let Ok(count) = value.parse::<u32>() {
            return Ok(count);
        }
        // Integer columns written through a float dtype come back as "8.0".
        match value.parse::<f64>() {
            Ok(count) if count >= 0.0 && count.fract() == 0.0 && count <= f64::from(u32::MAX) => {
                Ok(count as u32)
            }
            _ => Err(self.invalid(column, value)),
        }
    }

    pub fn invalid_label(&self, column: &Column) -> TableError {
        TableError::InvalidLabel {
            line: self.line,
            column: column.name.clone(),
            value: self.text(column).to_string(),
        }
    }

    fn invalid(&self, column: &Column, value: &str) -> TableError {
        TableError::InvalidNumber {
            line: self.line,
            column: column.name.clone(),
            value: value.to_string(),
        }
    }
}

fn split_records(source: &str) -> Result<Vec<(usize, Vec<String>)>, TableError> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut quote_line = 1;
    let mut chars = source.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(ch);
                }
                _ => field.push(ch),
            }
            continue;
        }

        match ch {
            '"' => {
                in_quotes = true;
                quote_line = line;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_record(&mut records, record_line, std::mem::take(&mut fields));
                line += 1;
                record_line = line;
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(TableError::UnterminatedQuote { line: quote_line });
    }
    fields.push(field);
    push_record(&mut records, record_line, fields);

    Ok(records)
}

fn push_record(records: &mut Vec<(usize, Vec<String>)>, line: usize, fields: Vec<String>) {
    if fields.iter().all(|field| field.trim().is_empty()) {
        return;
    }
    records.push((
        line,
        fields
            .into_iter()
            .map(|field| field.trim().to_string())
            .collect(),
    ));
}

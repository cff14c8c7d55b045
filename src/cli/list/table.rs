use std::fmt::{self, Write};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.contains(|c: char| c.is_whitespace()))
    }

    fn columns(&self) -> usize {
        self.cells.len()
    }
}

pub(crate) trait IntoRow: Into<Row> + Sized {
    fn into_row(self) -> Row {
        self.into()
    }
}

impl<T> IntoRow for T where T: Into<Row> + Sized {}

impl From<Vec<String>> for Row {
    fn from(value: Vec<String>) -> Self {
        Row { cells: value }
    }
}

impl From<Vec<&str>> for Row {
    fn from(value: Vec<&str>) -> Self {
        let value: Vec<String> = value.into_iter().map(|s| s.to_owned()).collect();

        value.into()
    }
}

/// A plain-text column-aligned table. Headers must stay awk safe so the
/// output can be post-processed with the usual shell tools.
pub(crate) struct Table {
    body: Vec<Row>,
    header: Option<Row>,
    num_columns: Option<usize>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new() -> Table {
        Table {
            body: Vec::new(),
            header: None,
            num_columns: None,
            print_header: true,
        }
    }

    fn expect_num_columns(&mut self, num_columns: usize) {
        match self.num_columns {
            Some(prev) if prev != num_columns => panic!(
                "Table has {} columns but a row with {} columns was inserted",
                prev, num_columns
            ),
            Some(_) => {}
            None => {
                self.num_columns = Some(num_columns);
            }
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn add_row<S: IntoRow>(&mut self, row: S) {
        let row = row.into_row();

        self.expect_num_columns(row.columns());

        self.body.push(row);
    }

    pub(crate) fn set_header<S: IntoRow>(&mut self, header: S) {
        let header = header.into_row();

        self.expect_num_columns(header.columns());

        if !header.is_awk_safe() {
            panic!("Table header is not awk safe, contains whitespace")
        }

        self.header.replace(header);
    }

    fn iter_rows(&self) -> impl Iterator<Item = &Row> {
        let header = match self.print_header {
            true => self.header.as_ref(),
            false => None,
        };

        header.into_iter().chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let n_cols = match self.num_columns {
            Some(n_cols) => n_cols,
            None => return Vec::new(),
        };

        let mut widths = vec![0usize; n_cols];

        for row in self.iter_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let widths = self.column_widths();

        for row in self.iter_rows() {
            for (i, cell) in row.cells.iter().enumerate() {
                if i == row.cells.len() - 1 {
                    f.write_str(cell)?;
                } else {
                    f.write_fmt(format_args!("{:<width$}  ", cell, width = widths[i]))?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_align_and_header_toggles() {
        let mut tab = Table::new();

        tab.set_header(vec!["NAME", "PROVIDER"]);
        tab.add_row(vec!["gpt-4-public", "azure"]);
        tab.add_row(vec!["m1", "openai"]);

        assert_eq!(
            tab.to_string(),
            "NAME          PROVIDER\ngpt-4-public  azure\nm1            openai\n"
        );

        tab.print_header(false);

        assert!(!tab.to_string().contains("NAME"));
    }

    #[test]
    #[should_panic]
    fn header_must_be_awk_safe() {
        let mut tab = Table::new();

        tab.set_header(vec!["MODEL NAME"]);
    }
}

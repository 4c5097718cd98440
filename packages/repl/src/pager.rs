//! Paged table output for long listings.
//!
//! Rows are numbered as they arrive. Every `page_size` rows the current page
//! is printed and the user is asked whether to go on; answering no ends the
//! listing early. Whatever is left is printed once the rows run out, unless
//! there were no rows at all.

use crate::context::Context;
use crate::io::IoError;
use crate::table::Table;

const QUESTION: &str = "continue [Y/n]?";

pub struct Pager {
    table: Table,
    total: usize,
    page_size: usize,
}

impl Pager {
    /// A pager whose table has an `id` column followed by `headers`.
    pub fn new(headers: &[&str], page_size: usize) -> Self {
        let mut all = vec!["id"];
        all.extend_from_slice(headers);
        Self {
            table: Table::new(&all),
            total: 0,
            page_size: page_size.max(1),
        }
    }

    /// Add a row. Returns `false` once the user asked to stop.
    pub fn add(&mut self, ctx: &mut Context<'_>, row: Vec<String>) -> Result<bool, IoError> {
        self.total += 1;
        let mut cells = Vec::with_capacity(row.len() + 1);
        cells.push(self.total.to_string());
        cells.extend(row);
        self.table.rows.push(cells);

        if self.total % self.page_size == 0 {
            self.flush(ctx)?;
            return ask_continue(ctx);
        }
        Ok(true)
    }

    /// Print the rows collected since the last page, if any.
    pub fn flush(&mut self, ctx: &mut Context<'_>) -> Result<(), IoError> {
        if self.table.rows.is_empty() {
            return Ok(());
        }
        ctx.println(self.table.render())?;
        self.table.rows.clear();
        Ok(())
    }

    /// Feed every row through the pager, stopping early if asked to, then
    /// print what is left. Returns the number of rows printed.
    ///
    /// A failing row ends the listing; the rows before it are still printed.
    pub fn print_all<E>(
        mut self,
        ctx: &mut Context<'_>,
        rows: impl IntoIterator<Item = Result<Vec<String>, E>>,
    ) -> Result<usize, E>
    where
        E: From<IoError>,
    {
        for row in rows {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    self.flush(ctx)?;
                    return Err(e);
                }
            };
            if !self.add(ctx, row)? {
                break;
            }
        }
        self.flush(ctx)?;
        Ok(self.total)
    }
}

/// Ask until the answer is a yes or a no. End of input counts as no.
fn ask_continue(ctx: &mut Context<'_>) -> Result<bool, IoError> {
    loop {
        let answer = match ctx.ask(QUESTION)? {
            Some(answer) => answer,
            None => return Ok(false),
        };
        match answer.trim_end_matches(['\r', '\n']) {
            "y" | "yes" | "Y" | "YES" | "Yes" | "" => return Ok(true),
            "n" | "no" | "N" | "No" | "NO" => return Ok(false),
            _ => ctx.println("Invalid input")?,
        }
    }
}

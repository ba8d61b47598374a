//! Read-only presentation of the signal state.
//!
//! A `SignalBoard` is built from the controller's two read accessors and
//! renders the "green signal / red signal" table an operator watches. It never
//! feeds anything back into scheduling.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalRow {
    pub name: String,
    pub has_green: bool,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalBoard {
    pub rows: Vec<SignalRow>,
}

impl SignalBoard {
    /// Joins the green and occupancy maps by approach name, keeping the order
    /// of `green`. Approaches missing from `occupancy` show a count of 0.
    pub fn new(green: &[(String, bool)], occupancy: &[(String, u32)]) -> Self {
        let rows = green
            .iter()
            .map(|(name, has_green)| SignalRow {
                name: name.clone(),
                has_green: *has_green,
                count: occupancy
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect();
        Self { rows }
    }

    pub fn green_approach(&self) -> Option<&str> {
        self.rows.iter().find(|r| r.has_green).map(|r| r.name.as_str())
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

impl fmt::Display for SignalBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .rows
            .iter()
            .map(|r| r.name.len())
            .max()
            .unwrap_or(0)
            .max("APPROACH".len());
        writeln!(f, "{:<width$}  {:<12}  {:<10}  VEHICLES", "APPROACH", "GREEN SIGNAL", "RED SIGNAL")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<width$}  {:<12}  {:<10}  {}",
                row.name,
                yes_no(row.has_green),
                yes_no(!row.has_green),
                row.count
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_joins_maps_and_renders_rows() {
        let green = vec![("NORTH".to_string(), false), ("SOUTH".to_string(), true)];
        let occupancy = vec![("SOUTH".to_string(), 3), ("NORTH".to_string(), 0)];
        let board = SignalBoard::new(&green, &occupancy);

        assert_eq!(board.green_approach(), Some("SOUTH"));
        assert_eq!(board.rows[1].count, 3);

        let text = board.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("APPROACH  GREEN SIGNAL"));
        assert_eq!(lines[1].split_whitespace().collect::<Vec<_>>(), vec!["NORTH", "No", "Yes", "0"]);
        assert_eq!(lines[2].split_whitespace().collect::<Vec<_>>(), vec!["SOUTH", "Yes", "No", "3"]);
    }

    #[test]
    fn idle_board_has_no_green() {
        let board = SignalBoard::new(&[("EAST".to_string(), false)], &[]);
        assert_eq!(board.green_approach(), None);
        assert_eq!(board.rows[0].count, 0);
    }
}

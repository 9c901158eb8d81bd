// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Column-based composite.
//!
//! A [`Grid`] splits its span into columns. Fixed columns have a set length,
//! auto columns fit the children placed in them, and star columns share what
//! is left in proportion to their weights. Each child occupies one or more
//! adjacent columns and is placed inside that cell by its own alignment.

use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{
    ensure_non_negative, field_error, measure, merge_channels, place, ArrangeContext, Arrangement,
    ElementRef, Layout, MeasuredElement, Measurement,
};

/// Length of one grid column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridLength {
    /// Fixed length in seconds.
    Seconds(f64),
    /// Fits the longest child placed only in this column.
    Auto,
    /// Weighted share of the remaining span.
    Star(f64),
}

impl Default for GridLength {
    fn default() -> Self {
        Self::Star(1.0)
    }
}

impl GridLength {
    fn validate(&self) -> Result<()> {
        match *self {
            Self::Seconds(v) => ensure_non_negative("columns.seconds", v),
            Self::Auto => Ok(()),
            Self::Star(v) => ensure_non_negative("columns.star", v),
        }
    }

    fn is_fixed(&self) -> bool {
        matches!(self, Self::Seconds(_))
    }

    fn star(&self) -> Option<f64> {
        match *self {
            Self::Star(v) => Some(v),
            _ => None,
        }
    }
}

impl FromStr for GridLength {
    type Err = crate::Error;

    /// Parse `auto`, `*`, `2.5*` or a number of seconds.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| field_error("columns", format!("invalid grid length '{}'", s)))
        };
        let length = if s.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else if let Some(weight) = s.strip_suffix('*') {
            if weight.trim().is_empty() {
                Self::Star(1.0)
            } else {
                Self::Star(parse(weight)?)
            }
        } else {
            Self::Seconds(parse(s)?)
        };
        length.validate()?;
        Ok(length)
    }
}

/// A child of a [`Grid`] and the columns it occupies.
#[derive(Debug, Clone)]
pub struct GridEntry {
    element: ElementRef,
    column: usize,
    span: usize,
}

impl GridEntry {
    /// Place `element` in the first column.
    pub fn new(element: ElementRef) -> Self {
        Self {
            element,
            column: 0,
            span: 1,
        }
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Occupy `span` columns, at least one.
    pub fn with_span(mut self, span: usize) -> Self {
        self.span = span.max(1);
        self
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn span(&self) -> usize {
        self.span
    }
}

/// Children laid out in columns.
///
/// Entries that point past the last column land in it, and spans are cut
/// at the last column.
#[derive(Debug, Clone)]
pub struct Grid {
    columns: Vec<GridLength>,
    entries: Vec<GridEntry>,
    children: Vec<ElementRef>,
    channels: Vec<ChannelId>,
}

impl Grid {
    /// Create a grid. No columns means a single star column.
    ///
    /// # Errors
    ///
    /// Column lengths and weights must be finite and non-negative.
    pub fn new(columns: Vec<GridLength>, entries: Vec<GridEntry>) -> Result<Self> {
        for column in &columns {
            column.validate()?;
        }
        let columns = if columns.is_empty() {
            vec![GridLength::default()]
        } else {
            columns
        };
        let children: Vec<ElementRef> = entries.iter().map(|e| Arc::clone(&e.element)).collect();
        let channels = merge_channels(children.iter().map(|c| c.channels()));
        Ok(Self {
            columns,
            entries,
            children,
            channels,
        })
    }

    pub fn columns(&self) -> &[GridLength] {
        &self.columns
    }

    pub fn entries(&self) -> &[GridEntry] {
        &self.entries
    }

    /// Column range of `entry`, clamped into the grid.
    fn cells(&self, entry: &GridEntry) -> std::ops::Range<usize> {
        let last = self.columns.len() - 1;
        let start = entry.column.min(last);
        let end = (start + entry.span).min(self.columns.len());
        start..end
    }

    /// Smallest column lengths that fit every child.
    fn min_sizes(&self, measured: &[MeasuredElement]) -> Vec<f64> {
        let mut sizes: Vec<f64> = self
            .columns
            .iter()
            .map(|c| match *c {
                GridLength::Seconds(v) => v,
                _ => 0.0,
            })
            .collect();

        let placed: Vec<_> = self
            .entries
            .iter()
            .zip(measured)
            .map(|(entry, m)| (self.cells(entry), m.duration()))
            .collect();

        for (cells, duration) in placed.iter().filter(|(cells, _)| cells.len() == 1) {
            let c = cells.start;
            if !self.columns[c].is_fixed() {
                sizes[c] = sizes[c].max(*duration);
            }
        }

        // Spanning children spread any shortfall over their flexible columns
        for (cells, duration) in placed.iter().filter(|(cells, _)| cells.len() > 1) {
            let current: f64 = sizes[cells.clone()].iter().sum();
            let deficit = duration - current;
            if deficit <= 0.0 {
                continue;
            }
            let flexible: Vec<usize> = cells
                .clone()
                .filter(|&c| !self.columns[c].is_fixed())
                .collect();
            if flexible.is_empty() {
                continue;
            }
            let share = deficit / flexible.len() as f64;
            for c in flexible {
                sizes[c] += share;
            }
        }
        sizes
    }

    /// Grow star columns to share `final_duration`.
    ///
    /// A star column whose minimum exceeds its proportional share keeps its
    /// minimum; the others split what remains.
    fn distribute(&self, sizes: &mut [f64], final_duration: f64) {
        let mut active: Vec<usize> = (0..self.columns.len())
            .filter(|&c| self.columns[c].star().is_some_and(|w| w > 0.0))
            .collect();
        if active.is_empty() {
            return;
        }
        let others: f64 = (0..sizes.len())
            .filter(|c| !active.contains(c))
            .map(|c| sizes[c])
            .sum();
        let mut available = (final_duration - others).max(0.0);

        loop {
            let weight: f64 = active.iter().filter_map(|&c| self.columns[c].star()).sum();
            let share = |c: usize| available * self.columns[c].star().unwrap_or(0.0) / weight;
            let pinned: Vec<usize> = active
                .iter()
                .copied()
                .filter(|&c| sizes[c] > share(c))
                .collect();
            if pinned.is_empty() {
                for &c in &active {
                    sizes[c] = share(c);
                }
                return;
            }
            for c in pinned {
                available = (available - sizes[c]).max(0.0);
                active.retain(|&a| a != c);
            }
            if active.is_empty() {
                return;
            }
        }
    }

    /// Upper bound for a child: its cell length when every column in it is
    /// fixed, otherwise the grid's own bound.
    fn child_bound(&self, entry: &GridEntry, max_duration: f64) -> f64 {
        let cells = self.cells(entry);
        if cells.clone().all(|c| self.columns[c].is_fixed()) {
            let fixed: f64 = cells
                .filter_map(|c| match self.columns[c] {
                    GridLength::Seconds(v) => Some(v),
                    _ => None,
                })
                .sum();
            fixed.min(max_duration)
        } else {
            max_duration
        }
    }
}

impl Layout for Grid {
    fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
        let children = self
            .entries
            .iter()
            .map(|entry| {
                let bound = self.child_bound(entry, max_duration);
                measure(Arc::clone(&entry.element), bound, options)
            })
            .collect::<Result<Vec<_>>>()?;
        let natural = self.min_sizes(&children).iter().sum();
        Ok(Measurement { natural, children })
    }

    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        let measured = context.measured.children();
        let mut sizes = self.min_sizes(measured);
        self.distribute(&mut sizes, context.final_duration);

        let mut starts = Vec::with_capacity(sizes.len());
        let mut cursor = 0.0;
        for size in &sizes {
            starts.push(cursor);
            cursor += size;
        }

        let children = self
            .entries
            .iter()
            .zip(measured)
            .map(|(entry, child)| {
                let cells = self.cells(entry);
                let span: f64 = sizes[cells.clone()].iter().sum();
                place(child, starts[cells.start], span, context.options)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arrangement {
            duration: context.final_duration,
            children,
        })
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    fn children(&self) -> Vec<&ElementRef> {
        self.children.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{arrange, render, Alignment, Barrier, Element, ElementCommon, Play};
    use super::*;
    use crate::carrier::{Instruction, InstructionQueue};
    use crate::error::{Error, LayoutError};

    fn block(duration: f64) -> ElementRef {
        let common = ElementCommon::builder()
            .duration(Some(duration))
            .alignment(Alignment::Start)
            .build()
            .unwrap();
        Arc::new(Element::new(common, Barrier::default()))
    }

    fn filler() -> ElementRef {
        let common = ElementCommon::builder()
            .alignment(Alignment::Stretch)
            .build()
            .unwrap();
        Arc::new(Element::new(common, Barrier::default()))
    }

    /// Lay out a grid in `final_duration` and return each child's
    /// `(start, duration)` along with the grid's natural duration.
    fn layout(grid: Grid, final_duration: f64) -> (f64, Vec<(f64, f64)>) {
        let options = ScheduleOptions::default();
        let m = measure(
            Arc::new(Element::from_variant(grid)),
            f64::INFINITY,
            &options,
        )
        .unwrap();
        let a = arrange(&m, 0.0, final_duration, &options).unwrap();
        let slots = a
            .children()
            .iter()
            .map(|c| (c.inner_time(), c.inner_duration()))
            .collect();
        (m.duration(), slots)
    }

    // =========================================================================
    // Column lengths
    // =========================================================================

    #[test]
    fn test_parse_grid_length() {
        assert_eq!("auto".parse::<GridLength>().unwrap(), GridLength::Auto);
        assert_eq!("*".parse::<GridLength>().unwrap(), GridLength::Star(1.0));
        assert_eq!("2.5*".parse::<GridLength>().unwrap(), GridLength::Star(2.5));
        assert_eq!("4e-8".parse::<GridLength>().unwrap(), GridLength::Seconds(4e-8));
        assert!("fast".parse::<GridLength>().is_err());
        assert!("-1".parse::<GridLength>().is_err());
    }

    #[test]
    fn test_new_rejects_negative_columns() {
        assert!(Grid::new(vec![GridLength::Seconds(-1.0)], vec![]).is_err());
        assert!(Grid::new(vec![GridLength::Star(f64::NAN)], vec![]).is_err());
        let grid = Grid::new(vec![], vec![]).unwrap();
        assert_eq!(grid.columns(), &[GridLength::Star(1.0)]);
    }

    #[test]
    fn test_grid_length_yaml() {
        let columns = vec![
            GridLength::Auto,
            GridLength::Seconds(2.0),
            GridLength::Star(3.0),
        ];
        let yaml = serde_yaml::to_string(&columns).unwrap();
        assert!(yaml.contains("auto"));
        assert!(yaml.contains("seconds"));
        let back: Vec<GridLength> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, columns);
    }

    // =========================================================================
    // Measure and arrange
    // =========================================================================

    #[test]
    fn test_fixed_auto_and_star_columns() {
        let grid = Grid::new(
            vec![
                GridLength::Seconds(2.0),
                GridLength::Auto,
                GridLength::Star(1.0),
                GridLength::Star(3.0),
            ],
            vec![
                GridEntry::new(block(1.0)),
                GridEntry::new(block(1.0)).at_column(1),
                GridEntry::new(filler()).at_column(2),
                GridEntry::new(filler()).at_column(3),
            ],
        )
        .unwrap();
        let (natural, slots) = layout(grid, 11.0);
        assert_eq!(natural, 3.0);
        assert_eq!(slots, vec![(0.0, 1.0), (2.0, 1.0), (3.0, 2.0), (5.0, 6.0)]);
    }

    #[test]
    fn test_star_column_keeps_its_minimum() {
        let grid = Grid::new(
            vec![GridLength::Star(1.0), GridLength::Star(1.0)],
            vec![
                GridEntry::new(block(5.0)),
                GridEntry::new(filler()).at_column(1),
            ],
        )
        .unwrap();
        let (natural, slots) = layout(grid, 8.0);
        assert_eq!(natural, 5.0);
        assert_eq!(slots, vec![(0.0, 5.0), (5.0, 3.0)]);
    }

    #[test]
    fn test_spanning_child_spreads_over_flexible_columns() {
        let grid = Grid::new(
            vec![GridLength::Auto, GridLength::Seconds(1.0), GridLength::Auto],
            vec![
                GridEntry::new(block(1.0)),
                GridEntry::new(filler()).with_span(3),
                GridEntry::new(block(6.0)).with_span(3),
            ],
        )
        .unwrap();
        let (natural, slots) = layout(grid, 6.0);
        // Shortfall of 4 over the two auto columns: [1 + 2, 1, 0 + 2]
        assert_eq!(natural, 6.0);
        assert_eq!(slots[0], (0.0, 1.0));
        assert_eq!(slots[1], (0.0, 6.0));
    }

    #[test]
    fn test_out_of_range_column_lands_in_last() {
        let grid = Grid::new(
            vec![GridLength::Seconds(2.0), GridLength::Seconds(3.0)],
            vec![GridEntry::new(filler()).at_column(7).with_span(4)],
        )
        .unwrap();
        let (natural, slots) = layout(grid, 5.0);
        assert_eq!(natural, 5.0);
        assert_eq!(slots, vec![(2.0, 3.0)]);
    }

    #[test]
    fn test_child_too_long_for_fixed_column_overflows() {
        let grid = Grid::new(
            vec![GridLength::Seconds(2.0)],
            vec![GridEntry::new(block(3.0))],
        )
        .unwrap();
        let err = measure(
            Arc::new(Element::from_variant(grid)),
            f64::INFINITY,
            &ScheduleOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Layout(LayoutError::Overflow { .. })));
    }

    #[test]
    fn test_flexible_pulse_fills_star_cell() {
        let common = ElementCommon::builder()
            .alignment(Alignment::Stretch)
            .build()
            .unwrap();
        let play = Play::new("xy0".into(), None, 1.0, 1.0)
            .unwrap()
            .with_flexible(true);
        let grid = Grid::new(
            vec![GridLength::Seconds(2.0), GridLength::Star(1.0)],
            vec![GridEntry::new(Arc::new(Element::new(common, play))).at_column(1)],
        )
        .unwrap();
        assert_eq!(grid.channels(), &[ChannelId::new("xy0")]);

        let options = ScheduleOptions::default();
        let m = measure(Arc::new(Element::from_variant(grid)), 10.0, &options).unwrap();
        let a = arrange(&m, 0.0, 10.0, &options).unwrap();
        let mut queue = InstructionQueue::new();
        render(&a, 0.0, &mut queue).unwrap();
        let played: Vec<_> = queue
            .iter()
            .filter_map(|i| match &i.instruction {
                Instruction::Play(p) => Some((i.time, p.duration())),
                _ => None,
            })
            .collect();
        assert_eq!(played, vec![(2.0, 8.0)]);
    }
}

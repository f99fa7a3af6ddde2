//! Named timing scopes.
//!
//! Setup and solve report their phases through a caller-owned
//! [`TimingSink`]. [`NoopTimer`] discards them; [`Profiler`] keeps a tree of
//! nested scopes and renders it with `Display`.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::warn;

pub trait TimingSink {
    /// Open scope `name` inside the currently open one.
    fn tic(&mut self, name: &str);
    /// Close scope `name`, which must be the innermost open scope.
    fn toc(&mut self, name: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTimer;

impl TimingSink for NoopTimer {
    fn tic(&mut self, _name: &str) {}
    fn toc(&mut self, _name: &str) {}
}

#[derive(Debug)]
struct Node {
    name: String,
    total: Duration,
    started: Option<Instant>,
    children: Vec<usize>,
}

impl Node {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), total: Duration::ZERO, started: None, children: Vec::new() }
    }
}

/// Hierarchical wall-clock profiler.
///
/// Re-entering a scope with the same name under the same parent accumulates
/// into one entry.
#[derive(Debug)]
pub struct Profiler {
    nodes: Vec<Node>,
    open: Vec<usize>,
    created: Instant,
}

impl Profiler {
    pub fn new(name: &str) -> Self {
        Self { nodes: vec![Node::new(name)], open: vec![0], created: Instant::now() }
    }

    /// Accumulated time of the earliest-created scope named `name`.
    pub fn total(&self, name: &str) -> Option<Duration> {
        self.nodes.iter().skip(1).find(|n| n.name == name).map(|n| n.total)
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, idx: usize, depth: usize, whole: f64) -> fmt::Result {
        let node = &self.nodes[idx];
        let secs = if idx == 0 { whole } else { node.total.as_secs_f64() };
        let pct = if whole > 0.0 { 100.0 * secs / whole } else { 0.0 };
        let label = format!("{:indent$}{}:", "", node.name, indent = 2 * depth);
        writeln!(f, "[{label:<28}{secs:>10.3} s] ({pct:>6.2}%)")?;
        for &c in &node.children {
            self.render(f, c, depth + 1, whole)?;
        }
        Ok(())
    }
}

impl TimingSink for Profiler {
    fn tic(&mut self, name: &str) {
        let parent = self.current();
        let existing = self.nodes[parent].children.iter().copied().find(|&c| self.nodes[c].name == name);
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.nodes.push(Node::new(name));
                let idx = self.nodes.len() - 1;
                self.nodes[parent].children.push(idx);
                idx
            }
        };
        self.nodes[idx].started = Some(Instant::now());
        self.open.push(idx);
    }

    fn toc(&mut self, name: &str) {
        let idx = self.current();
        if idx == 0 || self.nodes[idx].name != name {
            warn!(expected = %self.nodes[idx].name, found = name, "profiler scope mismatch");
            return;
        }
        let node = &mut self.nodes[idx];
        if let Some(start) = node.started.take() {
            node.total += start.elapsed();
        }
        self.open.pop();
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0, 0, self.created.elapsed().as_secs_f64())
    }
}

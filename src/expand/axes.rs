// src/expand/axes.rs

/// One independent variant axis, e.g. detectors or injection tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axis {
    name: String,
    values: Vec<String>,
}

impl Axis {
    /// Duplicate values are dropped, first occurrence wins.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for v in values {
            let v = v.into();
            if !unique.contains(&v) {
                unique.push(v);
            }
        }
        Self {
            name: name.into(),
            values: unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One point of a product: a value from every axis, in axis order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell<'a> {
    axes: &'a [Axis],
    indices: Vec<usize>,
}

impl<'a> Cell<'a> {
    /// Value of the named axis in this cell.
    pub fn get(&self, axis: &str) -> Option<&'a str> {
        let pos = self.axes.iter().position(|a| a.name() == axis)?;
        Some(self.axes[pos].values[self.indices[pos]].as_str())
    }

    pub fn values(&self) -> Vec<&'a str> {
        self.axes
            .iter()
            .zip(&self.indices)
            .map(|(axis, i)| axis.values[*i].as_str())
            .collect()
    }
}

/// Number of cells in the product of `axes`.
///
/// No axes gives one (empty) cell; any empty axis gives none.
pub fn cardinality(axes: &[Axis]) -> usize {
    axes.iter().map(Axis::len).product()
}

/// Iterate the Cartesian product, last axis varying fastest.
pub fn cartesian(axes: &[Axis]) -> CartesianProduct<'_> {
    let done = axes.iter().any(Axis::is_empty);
    CartesianProduct {
        axes,
        next: if done { None } else { Some(vec![0; axes.len()]) },
    }
}

#[derive(Debug, Clone)]
pub struct CartesianProduct<'a> {
    axes: &'a [Axis],
    next: Option<Vec<usize>>,
}

impl<'a> Iterator for CartesianProduct<'a> {
    type Item = Cell<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;

        // Odometer increment.
        let mut following = current.clone();
        let mut pos = following.len();
        let mut carried = true;
        while carried && pos > 0 {
            pos -= 1;
            following[pos] += 1;
            if following[pos] < self.axes[pos].len() {
                carried = false;
            } else {
                following[pos] = 0;
            }
        }
        if !carried {
            self.next = Some(following);
        }

        Some(Cell {
            axes: self.axes,
            indices: current,
        })
    }
}

//! Flow Sets: the continuous behavior of one discrete state.

use crate::expr::Expr;
use crate::ids::VarId;

/// Integration scheme for a differential flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Integration {
    /// Classical fourth-order Runge-Kutta.
    #[default]
    Rk4,
    /// Forward Euler: the derivative is sampled once at the step start.
    Euler,
}

/// One equation attached to a variable while a state is active.
#[derive(Debug, Clone)]
pub enum Flow {
    /// `var' = expr`, integrated over each step.
    Differential {
        var: VarId,
        expr: Expr,
        method: Integration,
    },
    /// `var = expr`, evaluated on demand.
    Algebraic { var: VarId, expr: Expr },
    /// `var` follows `expr` as it was `by` time units earlier.
    ///
    /// `by` is evaluated once, when the history buffer is first filled,
    /// and rounded up to whole steps. Every RK stage is recorded, so the
    /// delayed signal is as accurate as the integration itself.
    Delay { var: VarId, expr: Expr, by: Expr },
    /// `var = expr'`, a finite difference over the RK stage points.
    ///
    /// The value lags the signal by one stage and never feeds back into
    /// the signal's own evaluation.
    Derivative { var: VarId, expr: Expr },
}

impl Flow {
    pub fn diff(var: VarId, expr: Expr) -> Self {
        Flow::Differential {
            var,
            expr,
            method: Integration::Rk4,
        }
    }

    pub fn euler(var: VarId, expr: Expr) -> Self {
        Flow::Differential {
            var,
            expr,
            method: Integration::Euler,
        }
    }

    pub fn alg(var: VarId, expr: Expr) -> Self {
        Flow::Algebraic { var, expr }
    }

    pub fn delay(var: VarId, expr: Expr, by: Expr) -> Self {
        Flow::Delay { var, expr, by }
    }

    pub fn derive(var: VarId, expr: Expr) -> Self {
        Flow::Derivative { var, expr }
    }

    pub fn var(&self) -> VarId {
        match self {
            Flow::Differential { var, .. }
            | Flow::Algebraic { var, .. }
            | Flow::Delay { var, .. }
            | Flow::Derivative { var, .. } => *var,
        }
    }

    pub fn expr(&self) -> &Expr {
        match self {
            Flow::Differential { expr, .. }
            | Flow::Algebraic { expr, .. }
            | Flow::Delay { expr, .. }
            | Flow::Derivative { expr, .. } => expr,
        }
    }

    pub fn is_differential(&self) -> bool {
        matches!(self, Flow::Differential { .. })
    }

    pub fn is_algebraic(&self) -> bool {
        matches!(self, Flow::Algebraic { .. })
    }

    /// Whether the integrator owns the variable's value: it holds a stored
    /// value that changes from stage to stage.
    pub fn is_stepped(&self) -> bool {
        !self.is_algebraic()
    }
}

/// The flows of one state, indexed by variable.
#[derive(Debug, Clone, Default)]
pub struct FlowSet {
    flows: Vec<Flow>,
    by_var: Vec<Option<usize>>,
}

impl FlowSet {
    /// Index `flows` over a kind with `var_count` variables.
    ///
    /// Later flows for the same variable win; the builder rejects duplicates
    /// before this is called.
    pub(crate) fn new(var_count: usize, flows: Vec<Flow>) -> Self {
        let mut by_var = vec![None; var_count];
        for (i, flow) in flows.iter().enumerate() {
            if let Some(slot) = by_var.get_mut(flow.var().index()) {
                *slot = Some(i);
            }
        }
        Self { flows, by_var }
    }

    pub fn flow_for(&self, var: VarId) -> Option<&Flow> {
        self.by_var
            .get(var.index())
            .copied()
            .flatten()
            .map(|i| &self.flows[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter()
    }

    pub fn differential(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(|f| f.is_differential())
    }

    pub fn algebraic(&self) -> impl Iterator<Item = &Flow> {
        self.flows.iter().filter(|f| f.is_algebraic())
    }

    /// Delay and derivative flows.
    pub fn sampled(&self) -> impl Iterator<Item = &Flow> {
        self.flows
            .iter()
            .filter(|f| matches!(f, Flow::Delay { .. } | Flow::Derivative { .. }))
    }

    pub fn has_differential(&self) -> bool {
        self.flows.iter().any(Flow::is_differential)
    }

    /// Whether any variable changes during integration.
    pub fn has_stepped(&self) -> bool {
        self.flows.iter().any(Flow::is_stepped)
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }
}

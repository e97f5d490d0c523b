//! Kind validation logic.

use std::collections::HashSet;

use crate::error::{ModelError, ModelResult};
use crate::flow::Flow;
use crate::ids::StateId;
use crate::kind::{EventDef, LinkDef, QueueDef, VarDecl, VarDef};
use crate::transition::Transition;

/// Check that every reference resolves and every assignment is legal.
#[allow(clippy::too_many_arguments)]
pub(crate) fn validate_kind(
    kind: &str,
    vars: &[VarDef],
    links: &[LinkDef],
    queues: &[QueueDef],
    events: &[EventDef],
    states: &[String],
    flows: &[Vec<Flow>],
    transitions: &[Transition],
    start: Option<StateId>,
) -> ModelResult<()> {
    unique(kind, "variable", vars.iter().map(|v| v.name.as_str()))?;
    unique(kind, "link", links.iter().map(|l| l.name.as_str()))?;
    unique(kind, "queue", queues.iter().map(|q| q.name.as_str()))?;
    unique(kind, "event", events.iter().map(|e| e.name.as_str()))?;
    unique(kind, "state", states.iter().map(String::as_str))?;

    let invalid = |what: &'static str, index: usize| ModelError::InvalidRef {
        kind: kind.to_owned(),
        what,
        index,
    };

    match start {
        None => {
            return Err(ModelError::NoStart {
                kind: kind.to_owned(),
            });
        }
        Some(s) if s.is_exit() || s.index() >= states.len() => {
            return Err(invalid("start state", s.index()));
        }
        Some(_) => {}
    }

    if flows.len() > states.len() {
        return Err(invalid("state", flows.len() - 1));
    }

    // Flows: targets exist, are continuous, and appear once per state
    for (state_idx, state_flows) in flows.iter().enumerate() {
        let mut seen = HashSet::new();
        for flow in state_flows {
            let var = flow.var();
            let def = vars.get(var.index()).ok_or_else(|| invalid("variable", var.index()))?;
            match def.decl {
                VarDecl::Continuous => {}
                VarDecl::Constant => {
                    return Err(ModelError::FlowTarget {
                        kind: kind.to_owned(),
                        var: def.name.clone(),
                        decl: "constant",
                    });
                }
                VarDecl::Input => {
                    return Err(ModelError::FlowTarget {
                        kind: kind.to_owned(),
                        var: def.name.clone(),
                        decl: "input",
                    });
                }
            }
            if !seen.insert(var) {
                return Err(ModelError::DuplicateFlow {
                    kind: kind.to_owned(),
                    state: states[state_idx].clone(),
                    var: def.name.clone(),
                });
            }
        }
    }

    for t in transitions {
        if t.from().index() >= states.len() {
            return Err(invalid("state", t.from().index()));
        }
        if t.to().index() >= states.len() {
            return Err(invalid("state", t.to().index()));
        }
        if t.from().is_exit() {
            return Err(ModelError::LeavesExit {
                kind: kind.to_owned(),
                transition: t.name().to_owned(),
            });
        }
        for w in t.waits() {
            if w.queue.index() >= queues.len() {
                return Err(invalid("queue", w.queue.index()));
            }
        }
        for s in t.syncs() {
            if s.link.index() >= links.len() {
                return Err(invalid("link", s.link.index()));
            }
        }
        for e in t.events() {
            if e.event.index() >= events.len() {
                return Err(invalid("event", e.event.index()));
            }
        }

        let from_flows = flows.get(t.from().index()).map(Vec::as_slice).unwrap_or(&[]);
        let mut reset_vars = HashSet::new();
        for r in t.resets() {
            let def = vars
                .get(r.var.index())
                .ok_or_else(|| invalid("variable", r.var.index()))?;
            let reject = |reason: &'static str| ModelError::ResetTarget {
                kind: kind.to_owned(),
                transition: t.name().to_owned(),
                var: def.name.clone(),
                reason,
            };
            if def.strict {
                return Err(reject("strict"));
            }
            if def.decl == VarDecl::Input {
                return Err(reject("input"));
            }
            if from_flows
                .iter()
                .any(|f| f.var() == r.var && f.is_algebraic())
            {
                return Err(reject("algebraic"));
            }
            if !reset_vars.insert(r.var) {
                return Err(ModelError::DuplicateReset {
                    kind: kind.to_owned(),
                    transition: t.name().to_owned(),
                    var: def.name.clone(),
                });
            }
        }
    }

    Ok(())
}

fn unique<'a>(
    kind: &str,
    what: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> ModelResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ModelError::DuplicateName {
                kind: kind.to_owned(),
                what,
                name: name.to_owned(),
            });
        }
    }
    Ok(())
}

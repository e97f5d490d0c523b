//! Dense per-kind indices.
//!
//! Every table inside a [`KindDef`](crate::KindDef) is a `Vec`, so these are
//! plain positions. They are only meaningful together with the kind that
//! issued them.

use core::fmt;

macro_rules! index_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Build from a raw table position.
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Table position.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $label, self.0)
            }
        }
    };
}

index_type!(
    /// A variable slot in a kind's variable table.
    VarId,
    "Var"
);
index_type!(
    /// A discrete state of a kind.
    StateId,
    "State"
);
index_type!(
    /// A link slot in a kind's link table.
    LinkId,
    "Link"
);
index_type!(
    /// A message queue declared on a kind.
    QueueId,
    "Queue"
);
index_type!(
    /// An event a kind can emit.
    EventId,
    "Event"
);

impl StateId {
    /// The built-in terminal state. Components in `Exit` are no longer
    /// integrated or scanned for transitions.
    pub const EXIT: StateId = StateId(0);

    pub fn is_exit(self) -> bool {
        self == Self::EXIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_is_slot_zero() {
        assert!(StateId::EXIT.is_exit());
        assert_eq!(StateId::EXIT.index(), 0);
        assert!(!StateId::from_index(1).is_exit());
    }

    #[test]
    fn debug_names_the_table() {
        assert_eq!(format!("{:?}", VarId::from_index(4)), "Var(4)");
        assert_eq!(format!("{:?}", LinkId::from_index(0)), "Link(0)");
    }
}

//! `memberly-ability` — the authorization decision engine.
//!
//! One [`Ability`] is built from one immutable subject snapshot and answers
//! `can`/`cannot` queries over a closed set of actions and resource kinds.
//! Three grant sources combine into each decision: per-organization role
//! grants, age-tier content gating, and parental-consent gating for minors.
//! Composition is deny-overrides: any matching denial wins over any number
//! of matching grants, and an unmatched query denies (fail closed).
//!
//! The engine is pure: no I/O, no interior mutability, no caching across
//! calls. All facts (memberships, consent, organization flags) are fetched
//! by the caller beforehand and passed in as values.

pub mod ability;
pub mod action;
pub mod resource;
pub mod rule;

pub use ability::{Ability, Decision, IntegrityFlag};
pub use action::Action;
pub use resource::Resource;
pub use rule::{Effect, Rule};

//! Read-only data layer over DFT results for semiconductor materials:
//! convergence studies, E–V points with Vinet fits, and pseudo-binary alloy
//! records.

pub mod alloy;
pub mod catalog;
pub mod codec;
pub mod common;
pub mod convergence;
pub mod domain;
pub mod eos;
pub mod numerics;
pub mod store;

#[cfg(test)]
mod tests {
    use crate::alloy::AlloyDb;
    use crate::convergence::ConvergenceDb;
    use crate::eos::EosDb;

    fn assert_shareable<T: Send + Sync>() {}

    #[test]
    fn loaded_databases_can_be_shared_across_threads() {
        assert_shareable::<ConvergenceDb>();
        assert_shareable::<EosDb>();
        assert_shareable::<AlloyDb>();
    }
}

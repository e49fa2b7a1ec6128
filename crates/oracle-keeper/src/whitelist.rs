//! Vote-target maintenance

use crate::context::Context;
use crate::keeper::Keeper;
use oracle_core::prelude::*;
use std::collections::BTreeSet;

impl Keeper {
    /// Rewrite the vote targets when they no longer match `whitelist`
    ///
    /// `vote_targets` is the set the round started with. Denoms without
    /// display metadata get the default micro-denom metadata.
    pub fn apply_whitelist(
        &self,
        ctx: &mut Context<'_>,
        whitelist: &[Denom],
        vote_targets: &BTreeSet<Denom>,
    ) -> Result<()> {
        let changed = whitelist.len() != vote_targets.len()
            || whitelist.iter().any(|denom| !vote_targets.contains(denom));
        if !changed {
            return Ok(());
        }

        self.clear_vote_targets(ctx);
        for denom in whitelist {
            self.set_vote_target(ctx, denom)?;
            if !self.metadata.has_metadata(denom) {
                self.metadata.register(DenomMetadata::for_micro_denom(denom));
                tracing::debug!(denom = %denom, "Registered denom metadata");
            }
        }

        tracing::info!(targets = ?whitelist, "Vote targets updated from whitelist");
        Ok(())
    }
}

//! Integration tests for oracle voting rounds
//!
//! These tests drive a node block by block: commit-reveal voting, the
//! end-of-block tally, penalty windows and TWAPs over committed state.

use oracle_core::prelude::*;
use oracle_keeper::testutil::{
    acc_addr, params, setup, time, val_addr, MockStaking, BLOCK_TIME_SECS, TEST_CHAIN_ID,
};
use oracle_keeper::{
    MsgAggregateExchangeRateCombinedVote, MsgAggregateExchangeRatePrevote,
    MsgAggregateExchangeRateVote, MsgDelegateFeedConsent, OracleMsg,
};
use oracle_node::{Block, NodeConfig, OracleNode};
use std::sync::Arc;

fn node_with(n: u8, oracle: Params) -> (OracleNode, Arc<MockStaking>) {
    let (keeper, staking) = setup(n, 100);
    let mut config = NodeConfig::default();
    config.node.chain_id = TEST_CHAIN_ID.to_string();
    config.oracle = oracle;
    let node = OracleNode::new(config, keeper, time(0)).unwrap();
    (node, staking)
}

/// Node with one-block vote periods and `ueth` as the only vote target
fn eth_node(n: u8) -> (OracleNode, Arc<MockStaking>) {
    let mut oracle = params();
    oracle.whitelist = vec!["ueth".to_string()];
    node_with(n, oracle)
}

fn block(height: u64) -> Block {
    Block::new(height, time(height as i64 * BLOCK_TIME_SECS))
}

fn prevote(i: u8, salt: &str, rates: &str) -> MsgAggregateExchangeRatePrevote {
    MsgAggregateExchangeRatePrevote::new(
        AggregateVoteHash::compute(salt, rates, &val_addr(i)),
        acc_addr(i),
        val_addr(i),
    )
}

fn vote(i: u8, salt: &str, rates: &str) -> MsgAggregateExchangeRateVote {
    MsgAggregateExchangeRateVote::new(salt, rates, acc_addr(i), val_addr(i))
}

fn combined(i: u8, reveal: (&str, &str), commit: (&str, &str)) -> MsgAggregateExchangeRateCombinedVote {
    MsgAggregateExchangeRateCombinedVote {
        vote_salt: reveal.0.to_string(),
        vote_exchange_rates: reveal.1.to_string(),
        prevote_hash: AggregateVoteHash::compute(commit.0, commit.1, &val_addr(i)).to_hex(),
        feeder: acc_addr(i).to_string(),
        validator: val_addr(i).to_string(),
    }
}

fn dec(s: &str) -> Dec {
    s.parse().unwrap()
}

/// Prevote at height 1 and reveal at height 2 for each `(validator, rates)`
fn commit_and_reveal(node: &OracleNode, votes: &[(u8, &str)]) {
    let commits = votes
        .iter()
        .fold(block(1), |b, (i, rates)| b.with_msg(prevote(*i, "salt", rates)));
    assert_eq!(node.deliver_block(&commits).unwrap().failed(), 0);

    let reveals = votes
        .iter()
        .fold(block(2), |b, (i, rates)| b.with_msg(vote(*i, "salt", rates)));
    assert_eq!(node.deliver_block(&reveals).unwrap().failed(), 0);
}

mod round_tests {
    use super::*;

    #[test]
    fn test_unanimous_vote_sets_price() {
        let (node, _) = eth_node(3);
        commit_and_reveal(&node, &[(0, "1700ueth"), (1, "1700ueth"), (2, "1700ueth")]);

        let rate = node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).unwrap();
        assert_eq!(rate.exchange_rate, dec("1700"));
        assert_eq!(rate.last_update, 2);
        assert_eq!(rate.last_update_timestamp, 2 * BLOCK_TIME_SECS * 1000);

        // round at height 1 had no votes, round at height 2 was won
        let counter = node
            .query(|q, ctx| q.vote_penalty_counter(ctx, &val_addr(0).to_string()))
            .unwrap();
        assert_eq!(counter.success_count, 1);
        assert_eq!(counter.abstain_count, 1);
        assert_eq!(counter.miss_count, 0);
    }

    #[test]
    fn test_price_update_event() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "s", "1700ueth")))
            .unwrap();
        let result = node
            .deliver_block(&block(2).with_msg(vote(0, "s", "1700ueth")))
            .unwrap();

        let update = result
            .end_block_events
            .iter()
            .find(|e| e.kind == event_types::EXCHANGE_RATE_UPDATE)
            .unwrap();
        assert_eq!(update.attribute(attribute_keys::DENOM), Some("ueth"));
        assert_eq!(
            update.attribute(attribute_keys::EXCHANGE_RATE),
            Some("1700.000000000000000000")
        );
    }

    #[test]
    fn test_minority_vote_leaves_price_unset() {
        let (node, _) = eth_node(3);
        commit_and_reveal(&node, &[(0, "1700ueth")]);

        let err = node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).unwrap_err();
        assert!(matches!(err, OracleError::ExchangeRateNotFound(_)));
        // the whitelist restores the target for the next round
        let targets = node.query(|q, ctx| q.vote_targets(ctx)).unwrap();
        assert_eq!(targets, vec!["ueth".to_string()]);
    }

    #[test]
    fn test_threshold_power_is_inclusive() {
        // 2 of 4 equal validators is exactly half the bonded power
        let (node, _) = eth_node(4);
        commit_and_reveal(&node, &[(0, "1700ueth"), (1, "1690ueth")]);

        let rate = node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).unwrap();
        assert_eq!(rate.exchange_rate, dec("1690"));
    }

    #[test]
    fn test_abstain_is_not_a_miss() {
        let (node, _) = eth_node(3);
        commit_and_reveal(&node, &[(0, "0ueth"), (1, "1700ueth"), (2, "1700ueth")]);

        let rate = node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).unwrap();
        assert_eq!(rate.exchange_rate, dec("1700"));

        let abstainer = node
            .query(|q, ctx| q.vote_penalty_counter(ctx, &val_addr(0).to_string()))
            .unwrap();
        assert_eq!(abstainer.abstain_count, 2);
        assert_eq!(abstainer.miss_count, 0);
        assert_eq!(abstainer.success_count, 0);
    }

    #[test]
    fn test_cross_rates_against_reference() {
        let (node, _) = node_with(3, params());
        let rates = "12.5uatom,1700ueth";
        commit_and_reveal(&node, &[(0, rates), (1, rates), (2, rates)]);

        let prices = node.query(|q, ctx| q.exchange_rates(ctx)).unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].denom, "uatom");
        assert_eq!(prices[0].oracle_exchange_rate.exchange_rate, dec("12.5"));

        let eth = prices[1].oracle_exchange_rate.exchange_rate;
        assert!(eth > dec("1699.999999") && eth < dec("1700.000001"), "eth = {}", eth);

        let actives = node.query(|q, ctx| q.actives(ctx)).unwrap();
        assert_eq!(actives, vec!["uatom".to_string(), "ueth".to_string()]);
    }

    #[test]
    fn test_ballots_cleared_after_round() {
        let (node, _) = eth_node(1);
        commit_and_reveal(&node, &[(0, "1700ueth")]);

        assert!(node.query(|q, ctx| q.aggregate_votes(ctx)).unwrap().is_empty());
        assert!(node.query(|q, ctx| q.aggregate_prevotes(ctx)).unwrap().is_empty());

        // an empty round clears nothing and keeps the price
        node.deliver_block(&block(3)).unwrap();
        assert!(node.query(|q, ctx| q.aggregate_votes(ctx)).unwrap().is_empty());
        assert!(node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).is_ok());
    }
}

mod vote_tests {
    use super::*;

    #[test]
    fn test_wrong_salt_keeps_prevote() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "right", "1700ueth")))
            .unwrap();
        let result = node
            .deliver_block(&block(2).with_msg(vote(0, "wrong", "1700ueth")))
            .unwrap();

        assert_eq!(result.failed(), 1);
        assert!(matches!(
            result.msg_results[0].result,
            Err(OracleError::VerificationFailed { .. })
        ));
        assert!(result.msg_results[0].events.is_empty());

        let validator = val_addr(0).to_string();
        let stored = node.query(|q, ctx| q.aggregate_prevote(ctx, &validator)).unwrap();
        assert_eq!(stored.submit_block, 1);
        assert!(matches!(
            node.query(|q, ctx| q.aggregate_vote(ctx, &validator)),
            Err(OracleError::NoAggregateVote(_))
        ));
    }

    #[test]
    fn test_reveal_in_commit_period_rejected() {
        let (node, _) = eth_node(1);
        let result = node
            .deliver_block(
                &block(1)
                    .with_msg(prevote(0, "s", "1700ueth"))
                    .with_msg(vote(0, "s", "1700ueth")),
            )
            .unwrap();

        assert!(result.msg_results[0].is_ok());
        assert!(matches!(
            result.msg_results[1].result,
            Err(OracleError::RevealPeriodMismatch {
                prevote_period: 1,
                reveal_period: 1
            })
        ));
    }

    #[test]
    fn test_combined_votes_chain_rounds() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "a", "1700ueth")))
            .unwrap();
        let result = node
            .deliver_block(&block(2).with_msg(combined(0, ("a", "1700ueth"), ("b", "1710ueth"))))
            .unwrap();
        assert_eq!(result.failed(), 0);
        assert_eq!(result.msg_results[0].events.len(), 2);

        node.deliver_block(&block(3).with_msg(combined(0, ("b", "1710ueth"), ("c", "1720ueth"))))
            .unwrap();

        let rate = node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).unwrap();
        assert_eq!(rate.exchange_rate, dec("1710"));
        assert_eq!(rate.last_update, 3);

        let pending = node
            .query(|q, ctx| q.aggregate_prevote(ctx, &val_addr(0).to_string()))
            .unwrap();
        assert_eq!(pending.submit_block, 3);
    }

    #[test]
    fn test_delegated_feeder_votes() {
        let (node, _) = eth_node(1);
        let delegate = acc_addr(9);

        let hash = AggregateVoteHash::compute("s", "1700ueth", &val_addr(0));
        let result = node
            .deliver_block(
                &block(1)
                    .with_msg(MsgDelegateFeedConsent::new(val_addr(0), delegate))
                    .with_msg(MsgAggregateExchangeRatePrevote::new(hash, delegate, val_addr(0))),
            )
            .unwrap();
        assert_eq!(result.failed(), 0);

        let stranger = MsgAggregateExchangeRateVote::new("s", "1700ueth", acc_addr(8), val_addr(0));
        let result = node
            .deliver_block(
                &block(2)
                    .with_msg(stranger)
                    .with_msg(MsgAggregateExchangeRateVote::new("s", "1700ueth", delegate, val_addr(0))),
            )
            .unwrap();
        assert!(matches!(
            result.msg_results[0].result,
            Err(OracleError::NoVotingPermission { .. })
        ));
        assert!(result.msg_results[1].is_ok());

        let feeder = node
            .query(|q, ctx| q.feeder_delegation(ctx, &val_addr(0).to_string()))
            .unwrap();
        assert_eq!(feeder, delegate);
        assert!(node.query(|q, ctx| q.exchange_rate(ctx, "ueth")).is_ok());
    }

    #[test]
    fn test_unknown_denom_rejected() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "s", "1uxyz")))
            .unwrap();
        let result = node
            .deliver_block(&block(2).with_msg(vote(0, "s", "1uxyz")))
            .unwrap();
        assert!(matches!(
            result.msg_results[0].result,
            Err(OracleError::UnknownDenom(ref d)) if d == "uxyz"
        ));
    }
}

mod penalty_tests {
    use super::*;

    /// Window of 4 blocks with a 60% validity floor
    fn window_params() -> Params {
        let mut oracle = params();
        oracle.whitelist = vec!["ueth".to_string()];
        oracle.slash_window = 4;
        oracle.min_valid_per_window = dec("0.6");
        oracle
    }

    #[test]
    fn test_slash_window_penalties() {
        // 0 and 1 honest, 2 reports an outlier, 3 never votes
        let (node, staking) = node_with(4, window_params());
        let rate_of = |i: u8| if i == 2 { "1000ueth" } else { "1700ueth" };

        let commits = (0..3).fold(block(1), |b, i| b.with_msg(prevote(i, "s1", rate_of(i))));
        node.deliver_block(&commits).unwrap();
        for height in 2..=3u64 {
            let (reveal, commit) = (format!("s{}", height - 1), format!("s{}", height));
            let msgs = (0..3).fold(block(height), |b, i| {
                b.with_msg(combined(i, (reveal.as_str(), rate_of(i)), (commit.as_str(), rate_of(i))))
            });
            assert_eq!(node.deliver_block(&msgs).unwrap().failed(), 0);
        }

        let slashes = staking.slashes();
        assert_eq!(slashes.len(), 2);
        assert_eq!(slashes[0].cons_address, oracle_keeper::testutil::cons_addr(2));
        assert_eq!(slashes[0].infraction_height, 3 - (VALIDATOR_UPDATE_DELAY + 1));
        assert_eq!(slashes[0].fraction, window_params().slash_fraction);
        assert_eq!(slashes[1].cons_address, oracle_keeper::testutil::cons_addr(3));

        // missing votes jails, abstaining does not
        assert!(staking.is_jailed(&val_addr(2)));
        assert!(!staking.is_jailed(&val_addr(3)));
        assert!(!staking.is_jailed(&val_addr(0)));

        // counters start over for the next window
        let counters: Vec<VotePenaltyCounter> = (0..4)
            .map(|i| {
                node.query(|q, ctx| q.vote_penalty_counter(ctx, &val_addr(i).to_string()))
                    .unwrap()
            })
            .collect();
        assert!(counters.iter().all(|c| *c == VotePenaltyCounter::default()));
    }

    #[test]
    fn test_jailed_validator_cannot_vote() {
        let (node, staking) = eth_node(2);
        staking.set_bonded(&val_addr(1), false);

        let result = node
            .deliver_block(&block(1).with_msg(prevote(1, "s", "1700ueth")))
            .unwrap();
        assert!(matches!(
            result.msg_results[0].result,
            Err(OracleError::ValidatorNotBonded(_))
        ));
    }
}

mod twap_tests {
    use super::*;

    #[test]
    fn test_twap_over_committed_snapshots() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "a", "1700ueth")))
            .unwrap();
        node.deliver_block(&block(2).with_msg(combined(0, ("a", "1700ueth"), ("b", "1800ueth"))))
            .unwrap();
        node.deliver_block(&block(3).with_msg(combined(0, ("b", "1800ueth"), ("c", "1800ueth"))))
            .unwrap();

        // 1700 held from t=10 to t=15
        let twaps = node.query(|q, ctx| q.twaps(ctx, 10)).unwrap();
        assert_eq!(twaps.len(), 1);
        assert_eq!(twaps[0].twap, dec("1700"));
        assert_eq!(twaps[0].lookback_seconds, 5);

        node.deliver_block(&block(4).with_msg(combined(0, ("c", "1800ueth"), ("d", "1800ueth"))))
            .unwrap();

        // 1700 for 5s then 1800 for 5s
        let twaps = node.query(|q, ctx| q.twaps(ctx, 10)).unwrap();
        assert_eq!(twaps[0].twap, dec("1750"));
        assert_eq!(twaps[0].lookback_seconds, 10);

        let history = node.query(|q, ctx| q.price_snapshot_history(ctx)).unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.windows(2).all(|w| w[0].snapshot_timestamp < w[1].snapshot_timestamp));
    }

    #[test]
    fn test_twap_lookback_bounds() {
        let (node, _) = eth_node(1);
        let max = i64::try_from(params().lookback_duration).unwrap();

        assert!(matches!(
            node.query(|q, ctx| q.twaps(ctx, 0)),
            Err(OracleError::InvalidTwapLookback { .. })
        ));
        assert!(matches!(
            node.query(|q, ctx| q.twaps(ctx, max + 1)),
            Err(OracleError::InvalidTwapLookback { .. })
        ));
        assert!(matches!(
            node.query(|q, ctx| q.twaps(ctx, max)),
            Err(OracleError::NoTwapData)
        ));
    }
}

mod node_tests {
    use super::*;

    #[test]
    fn test_check_tx_rejects_second_vote_at_height() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1).with_msg(prevote(0, "s", "1700ueth")))
            .unwrap();

        let msgs: Vec<OracleMsg> = vec![vote(0, "s", "1700ueth").into()];
        node.check_tx(&msgs).unwrap();
        assert!(matches!(
            node.check_tx(&msgs),
            Err(OracleError::AlreadyVotedAtHeight { height: 1, .. })
        ));

        node.deliver_block(&block(2)).unwrap();
        node.check_tx(&msgs).unwrap();
    }

    #[test]
    fn test_check_tx_runs_basic_validation() {
        let (node, _) = eth_node(1);
        let bad: Vec<OracleMsg> = vec![vote(0, "", "1700ueth").into()];
        assert!(matches!(
            node.check_tx(&bad),
            Err(OracleError::InvalidSaltLength { actual: 0, .. })
        ));
    }

    #[test]
    fn test_failed_message_does_not_block_others() {
        let (node, _) = eth_node(2);
        let result = node
            .deliver_block(
                &block(1)
                    .with_msg(vote(0, "s", "1700ueth"))
                    .with_msg(prevote(1, "s", "1700ueth")),
            )
            .unwrap();

        assert_eq!(result.failed(), 1);
        assert!(matches!(
            result.msg_results[0].result,
            Err(OracleError::NoAggregatePrevote(_))
        ));
        assert_eq!(result.msg_results[1].msg_type, "aggregate_exchange_rate_prevote");

        let prevotes = node.query(|q, ctx| q.aggregate_prevotes(ctx)).unwrap();
        assert_eq!(prevotes.len(), 1);
        assert_eq!(prevotes[0].voter, val_addr(1));
    }

    #[test]
    fn test_heights_must_advance() {
        let (node, _) = eth_node(1);
        node.deliver_block(&block(1)).unwrap();
        assert!(node.deliver_block(&block(1)).is_err());
        assert_eq!(node.last_height(), 1);
    }

    #[test]
    fn test_query_handle_sees_commits_from_other_threads() {
        let (node, _) = eth_node(1);
        let handle = node.query_handle();
        commit_and_reveal(&node, &[(0, "1700ueth")]);

        let rate = std::thread::spawn(move || {
            assert_eq!(handle.last_height(), 2);
            handle.query(|q, ctx| q.exchange_rate(ctx, "ueth"))
        })
        .join()
        .unwrap()
        .unwrap();
        assert_eq!(rate.exchange_rate, dec("1700"));
    }

    #[test]
    fn test_params_from_genesis() {
        let (node, staking) = eth_node(1);
        let stored = node.query(|q, ctx| q.params(ctx)).unwrap();
        assert_eq!(stored.whitelist, vec!["ueth".to_string()]);
        assert!(staking.metadata("ueth").is_some());
    }

    #[test]
    fn test_genesis_rejects_base_denom_whitelist() {
        let (keeper, _) = setup(3, 100);
        let mut config = NodeConfig::default();
        config.oracle = params();
        config.oracle.whitelist = vec![BASE_DENOM.to_string()];

        assert!(matches!(
            OracleNode::new(config, keeper, time(0)),
            Err(OracleError::InvalidParams(_))
        ));
    }
}

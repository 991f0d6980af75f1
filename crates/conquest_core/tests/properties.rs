//! Property tests: random action streams must never break the world.

use conquest_core::combat;
use conquest_core::prelude::*;
use conquest_test_utils::fixtures::{generated_game, Scenario};
use conquest_test_utils::invariants::{assert_world_consistent, MonotonicWatch};
use conquest_test_utils::proptest::prelude::*;
use conquest_test_utils::strategies::{arb_steps, Step};

const PLAYERS: u32 = 3;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_random_steps_keep_world_consistent(
        seed in any::<u64>(),
        steps in arb_steps(30, 20, PLAYERS, 80),
    ) {
        let (mut game, _) = generated_game(seed, PLAYERS as usize);
        let mut watch = MonotonicWatch::new();

        for step in steps {
            match step {
                Step::Tick => {
                    let report = game.tick();
                    prop_assert!(!report.faulted);
                }
                Step::Act(player, action) => {
                    let before = game.state_hash();
                    match game.apply(player, action) {
                        Ok(_) => {}
                        Err(ActionError::Invalid(_)) => {
                            prop_assert_eq!(before, game.state_hash(), "rejection mutated the world");
                        }
                        Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                    }
                }
            }
            assert_world_consistent(game.world());
            prop_assert!(game.world().check_invariants().is_ok());
            watch.observe(game.world());
        }
    }

    #[test]
    fn test_same_steps_same_hash(
        seed in any::<u64>(),
        steps in arb_steps(30, 20, PLAYERS, 40),
    ) {
        let run = || {
            let (mut game, _) = generated_game(seed, PLAYERS as usize);
            for step in &steps {
                match step {
                    Step::Tick => {
                        game.tick();
                    }
                    Step::Act(player, action) => {
                        let _ = game.apply(*player, action.clone());
                    }
                }
            }
            game.state_hash()
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn test_attack_matches_defense_formula(
        garrison in 0..50u32,
        mountains in any::<bool>(),
        post in any::<bool>(),
        committed in 1..120u32,
    ) {
        let mut scenario = Scenario::plains(2, 1);
        let attacker = scenario.player("A", 0, 0, 120);
        let defender = scenario.player("D", 0, 5, 5);
        let target = TileId::new(1, 0);
        scenario.own(attacker, TileId::new(0, 0), 1);
        if mountains {
            scenario.terrain(target, Terrain::Mountains);
        }
        scenario.own(defender, target, garrison);
        if post {
            scenario.building(target, BuildingType::DefensePost);
        }
        let mut game = scenario.build();

        let expected_defense = u64::from(garrison)
            * if mountains { 2 } else { 1 }
            * if post { 3 } else { 1 };
        prop_assert_eq!(
            combat::defense_power(game.world().tile(target).unwrap(), game.rules()),
            expected_defense
        );

        game.apply(
            attacker,
            Action::AttackTerritory { target_territory_id: target, troop_count: committed },
        )
        .unwrap();

        let tile = game.world().tile(target).unwrap();
        let attack = u64::from(committed);
        if attack > expected_defense {
            prop_assert_eq!(tile.owner, Some(attacker));
            prop_assert_eq!(u64::from(tile.troops), attack - expected_defense);
            prop_assert!(tile.buildings.is_empty());
        } else {
            prop_assert_eq!(tile.owner, Some(defender));
            prop_assert_eq!(u64::from(tile.troops), expected_defense - attack);
        }
        prop_assert_eq!(game.world().player(attacker).unwrap().troops, 120 - committed);
        assert_world_consistent(game.world());
    }
}

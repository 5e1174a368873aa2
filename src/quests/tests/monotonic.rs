use hero::Inventory;
use proptest::prelude::*;
use quests::{PersistentState, QuestConfig, QuestEngine, QuestKind, QuestRegistry};
use std::sync::Arc;

fn engine() -> QuestEngine {
    QuestEngine::new(
        Arc::new(QuestRegistry::with_defaults()),
        vec![
            QuestConfig {
                id: "count".into(),
                title: "Count".into(),
                description: None,
                completion_note: None,
                kind: QuestKind::Collect {
                    objective_item_ids: None,
                    objective_count: 3,
                },
            },
            QuestConfig {
                id: "hunt".into(),
                title: "Hunt".into(),
                description: None,
                completion_note: None,
                kind: QuestKind::Defeat {
                    progress_flag: "kills".into(),
                    objective_count: 2,
                },
            },
            QuestConfig {
                id: "walk".into(),
                title: "Walk".into(),
                description: None,
                completion_note: None,
                kind: QuestKind::Escort {
                    completed_flag: "arrived".into(),
                },
            },
        ],
    )
}

proptest! {
    // Arbitrary sequences of context changes never un-complete a quest and
    // never report the same completion twice.
    #[test]
    fn completion_is_monotonic(steps in prop::collection::vec((0u32..6, -3i64..4, any::<bool>()), 1..40)) {
        let engine = engine();
        let inventory = Inventory::new(4);
        let mut state = PersistentState::default();
        let mut reported = std::collections::BTreeSet::new();

        for (objectives, kills, arrived) in steps {
            let before: Vec<String> = state
                .quests
                .values()
                .filter(|q| q.completed)
                .map(|q| q.id.clone())
                .collect();

            state.set_flag("kills", kills);
            state.set_flag("arrived", arrived);
            for done in engine.evaluate(&mut state, &inventory, objectives) {
                prop_assert!(reported.insert(done.quest_id));
            }

            for id in before {
                prop_assert!(state.is_quest_complete(&id));
            }
        }
    }
}

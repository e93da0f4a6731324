use tally_common::{now_ms, start_of_day, ActionKind, Frequency, Habit};
use tally_store::{LocalStore, UserStats};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn store_with(habits: &[Habit]) -> LocalStore {
    let store = LocalStore::open_in_memory().unwrap();
    for habit in habits {
        store.insert_habit(habit).unwrap();
    }
    store
}

#[test]
fn test_insert_get_and_list_newest_first() {
    let mut older = Habit::new("u1", "Read");
    older.created_at -= 1000;
    older.updated_at = older.created_at;
    let newer = Habit::new("u1", "Run");
    let other_user = Habit::new("u2", "Swim");

    let store = store_with(&[older.clone(), newer.clone(), other_user]);

    assert_eq!(store.get_habit(&older.id).unwrap(), Some(older.clone()));
    let listed = store.list_habits("u1").unwrap();
    assert_eq!(listed, vec![newer, older]);
}

#[test]
fn test_update_habit_rewrites_fields() {
    let habit = Habit::new("u1", "Read");
    let store = store_with(&[habit.clone()]);

    let mut changed = habit.clone();
    changed.title = "Read fiction".to_string();
    changed.notes = "20 pages".to_string();
    changed.updated_at = now_ms() + 5;
    store.update_habit(&changed).unwrap();

    assert_eq!(store.get_habit(&habit.id).unwrap(), Some(changed));
}

#[test]
fn test_delete_cascades_to_instances() {
    let habit = Habit::new("u1", "Read");
    let store = store_with(&[habit.clone()]);
    let today = start_of_day(now_ms());

    store.complete_habit(&habit.id, today).unwrap();
    assert!(store.get_instance(&habit.id, today).unwrap().is_some());

    store.delete_habit(&habit.id).unwrap();
    assert_eq!(store.get_habit(&habit.id).unwrap(), None);
    assert!(store.get_instance(&habit.id, today).unwrap().is_none());
}

#[test]
fn test_completion_is_idempotent_per_day() {
    let habit = Habit::new("u1", "Read");
    let store = store_with(&[habit.clone()]);
    let today = start_of_day(now_ms());

    let first = store.complete_habit(&habit.id, today).unwrap().unwrap();
    assert_eq!(first.streak_count, 1);
    assert_eq!(first.last_completed, Some(today));

    // Second completion on the same calendar day changes nothing.
    let second = store.complete_habit(&habit.id, today).unwrap().unwrap();
    assert_eq!(second.streak_count, 1);
    assert_eq!(store.completed_count(&habit.id).unwrap(), 1);
}

#[test]
fn test_streak_increments_once_per_calendar_day() {
    let habit = Habit::new("u1", "Read");
    let store = store_with(&[habit.clone()]);
    let today = start_of_day(now_ms());

    store.complete_habit(&habit.id, today - DAY_MS).unwrap();
    let updated = store.complete_habit(&habit.id, today).unwrap().unwrap();

    assert_eq!(updated.streak_count, 2);
    assert_eq!(store.completed_count(&habit.id).unwrap(), 2);
}

#[test]
fn test_completing_unknown_habit_returns_none() {
    let store = LocalStore::open_in_memory().unwrap();
    let result = store.complete_habit("missing", now_ms()).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_apply_dispatches_every_action_kind() {
    let store = LocalStore::open_in_memory().unwrap();
    let habit = Habit::new("u1", "Run");
    let today = start_of_day(now_ms());

    store
        .apply(&ActionKind::CreateHabit(habit.clone()))
        .unwrap();
    let mut changed = habit.clone();
    changed.category = "health".to_string();
    changed.updated_at += 1;
    store.apply(&ActionKind::UpdateHabit(changed)).unwrap();
    store
        .apply(&ActionKind::CompleteHabit {
            habit_id: habit.id.clone(),
            date: today,
        })
        .unwrap();

    let stored = store.get_habit(&habit.id).unwrap().unwrap();
    assert_eq!(stored.category, "health");
    assert_eq!(stored.streak_count, 1);

    store
        .apply(&ActionKind::DeleteHabit {
            habit_id: habit.id.clone(),
        })
        .unwrap();
    assert!(store.get_habit(&habit.id).unwrap().is_none());
}

#[test]
fn test_invalid_custom_habit_is_rejected() {
    let store = LocalStore::open_in_memory().unwrap();
    let mut habit = Habit::new("u1", "Gym");
    habit.frequency = Frequency::Custom;
    assert!(store.insert_habit(&habit).is_err());
    assert!(store.get_habit(&habit.id).unwrap().is_none());
}

#[test]
fn test_daily_counts_and_user_stats() {
    let run = Habit::new("u1", "Run");
    let read = Habit::new("u1", "Read");
    let store = store_with(&[run.clone(), read.clone()]);
    let today = start_of_day(now_ms());

    store.complete_habit(&run.id, today).unwrap();
    store.complete_habit(&read.id, today).unwrap();
    store.complete_habit(&read.id, today - DAY_MS).unwrap();

    assert_eq!(store.completed_count_for_date(today).unwrap(), 2);
    assert_eq!(
        store.user_stats("u1").unwrap(),
        UserStats {
            habit_count: 2,
            total_streaks: 3
        }
    );
}

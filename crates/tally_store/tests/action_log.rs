use tally_common::{ActionKind, Habit};
use tally_store::ActionLog;

fn delete(habit_id: &str) -> ActionKind {
    ActionKind::DeleteHabit {
        habit_id: habit_id.to_string(),
    }
}

#[test]
fn test_fifo_order_minus_removed_ids() {
    let log = ActionLog::open_in_memory().unwrap();

    let a = log.enqueue(delete("a")).unwrap();
    let b = log.enqueue(delete("b")).unwrap();
    let c = log.enqueue(delete("c")).unwrap();
    let d = log.enqueue(delete("d")).unwrap();

    log.remove(&[b.id.clone()]).unwrap();

    let ids: Vec<String> = log.peek_all().unwrap().into_iter().map(|x| x.id).collect();
    assert_eq!(ids, vec![a.id, c.id, d.id], "FIFO order must survive removal");
}

#[test]
fn test_size_tracks_enqueue_and_remove() {
    let log = ActionLog::open_in_memory().unwrap();
    assert_eq!(log.size().unwrap(), 0);

    let a = log.enqueue(delete("a")).unwrap();
    let b = log.enqueue(delete("b")).unwrap();
    log.enqueue(delete("c")).unwrap();
    assert_eq!(log.size().unwrap(), 3);

    log.remove(&[a.id, b.id]).unwrap();
    assert_eq!(log.size().unwrap(), 1);
}

#[test]
fn test_peek_does_not_mutate() {
    let log = ActionLog::open_in_memory().unwrap();
    log.enqueue(delete("a")).unwrap();
    log.enqueue(delete("b")).unwrap();

    let first = log.peek_all().unwrap();
    let second = log.peek_all().unwrap();
    assert_eq!(first, second);
    assert_eq!(log.size().unwrap(), 2);
}

#[test]
fn test_log_survives_reopen_in_order() {
    let temp = assert_fs::TempDir::new().unwrap();
    let path = temp.path().join("queue.db");

    let habit = Habit::new("u1", "Run");
    let ids = {
        let log = ActionLog::open(&path).unwrap();
        let a = log.enqueue(ActionKind::CreateHabit(habit.clone())).unwrap();
        let b = log
            .enqueue(ActionKind::CompleteHabit {
                habit_id: habit.id.clone(),
                date: 1_700_000_000_000,
            })
            .unwrap();
        vec![a.id, b.id]
    };

    let reopened = ActionLog::open(&path).unwrap();
    let pending = reopened.peek_all().unwrap();
    assert_eq!(
        pending.iter().map(|a| a.id.clone()).collect::<Vec<_>>(),
        ids
    );
    assert_eq!(pending[0].kind, ActionKind::CreateHabit(habit));
}

//! Property-based tests for the menu and workday invariants

use super::labels::{self, BREAK_OPTIONS, FOCUS_OPTIONS};
use super::*;
use crate::user::workday::MAX_TASKS_PER_DAY;
use crate::user::{Task, User, UserWorkday};
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn user_in(menu: Menu, step: Step) -> User {
    let mut user = User::new("Prop");
    user.last_action = UserAction::with_step(menu, step);
    user
}

/// Apply a transition the way the dispatcher would, minus the timers
fn apply(user: &User, result: TransitionResult) -> User {
    let mut next = user.clone();
    for effect in result.effects {
        if let Effect::SaveUser(saved) = effect {
            next = saved;
        }
    }
    next.last_action = result.next;
    next
}

fn arb_free_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}"
}

fn arb_task_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set("[a-z]{1,6}", 1..=MAX_TASKS_PER_DAY)
        .prop_map(|set| set.into_iter().collect())
}

// ============================================================================
// Durations
// ============================================================================

proptest! {
    #[test]
    fn focus_option_sets_that_duration(index in 0usize..4) {
        let user = user_in(Menu::SettingsFocusDuration, Step::ChooseFocusDuration);
        let result = process(FOCUS_OPTIONS[index], &user, None);
        let next = apply(&user, result);
        prop_assert_eq!(next.focus_duration_mins, crate::user::FOCUS_DURATIONS[index]);
        prop_assert_eq!(next.last_action.menu, Menu::MainMenu);
    }

    #[test]
    fn unknown_focus_text_changes_nothing(text in arb_free_text()) {
        prop_assume!(!FOCUS_OPTIONS.contains(&text.as_str()));
        let user = user_in(Menu::SettingsFocusDuration, Step::ChooseFocusDuration);
        let result = process(&text, &user, None);
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(&result.next, &user.last_action);
        prop_assert_eq!(apply(&user, result).focus_duration_mins, user.focus_duration_mins);
    }

    #[test]
    fn break_option_sets_that_duration(index in 0usize..4) {
        let user = user_in(Menu::InitBreak, Step::Idle);
        let next = apply(&user, process(BREAK_OPTIONS[index], &user, None));
        prop_assert_eq!(next.break_duration_mins, crate::user::BREAK_DURATIONS[index]);
    }

    #[test]
    fn unknown_break_text_changes_nothing(text in arb_free_text()) {
        prop_assume!(!BREAK_OPTIONS.contains(&text.as_str()));
        let user = user_in(Menu::SettingsBreakDuration, Step::ChooseBreakDuration);
        let result = process(&text, &user, None);
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(apply(&user, result).break_duration_mins, user.break_duration_mins);
    }
}

// ============================================================================
// Workday
// ============================================================================

proptest! {
    /// Driving "Add task" flows through the menu never grows the list past capacity
    #[test]
    fn task_list_never_exceeds_capacity(
        names in prop::collection::vec("[a-z]{1,4}", 1..20),
        periods in prop::collection::vec(1u8..=9, 20),
    ) {
        let mut user = user_in(Menu::SettingsWorkday, Step::Idle);
        for (name, p) in names.iter().zip(periods) {
            for text in [labels::ADD_TASK.to_string(), name.clone(), p.to_string()] {
                let result = process(&text, &user, None);
                user = apply(&user, result);
                prop_assert!(user.workday.len() <= MAX_TASKS_PER_DAY);
            }
        }
        let mut unique = user.workday.task_names();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), user.workday.len());
    }

    #[test]
    fn set_task_position_preserves_relative_order(
        names in arb_task_names(),
        pick in any::<prop::sample::Index>(),
        target in any::<prop::sample::Index>(),
    ) {
        let mut day = UserWorkday::default();
        for name in &names {
            day.add_task(Task::new(name.clone(), 1)).unwrap();
        }
        let moved = names[pick.index(names.len())].clone();
        let k = target.index(names.len());

        day.set_task_position(&moved, k).unwrap();

        let after = day.task_names();
        prop_assert_eq!(&after[k], &moved);
        let others_before: Vec<_> = names.iter().filter(|n| **n != moved).collect();
        let others_after: Vec<_> = after.iter().filter(|n| **n != moved).collect();
        prop_assert_eq!(others_before, others_after);
    }

    /// Any input in the order step either moves the task or leaves the list untouched
    #[test]
    fn task_order_input_is_validated(names in arb_task_names(), input in "[0-9a-z]{0,3}") {
        let mut user = user_in(Menu::SettingsWorkday, Step::Idle);
        for name in &names {
            user.workday.add_task(Task::new(name.clone(), 2)).unwrap();
        }
        user.last_action = UserAction::with_step(
            Menu::SettingsWorkdayTaskEdit,
            Step::TaskOrder { task_name: names[0].clone() },
        );

        let result = process(&input, &user, None);
        let valid = input
            .parse::<usize>()
            .is_ok_and(|p| (1..=names.len()).contains(&p));
        if valid {
            let next = apply(&user, result);
            prop_assert_eq!(next.workday.len(), names.len());
        } else {
            prop_assert!(result.effects.is_empty());
            prop_assert_eq!(result.next, user.last_action);
        }
    }
}

//! Validator properties
//!
//! The validator is a pure gate, so its contract is checked over generated
//! plans rather than hand-picked ones.

use proptest::prelude::*;
use systemai_common::validator::{check_action, validate, DESTRUCTIVE_PATTERNS, PROTECTED_PATHS};
use systemai_common::{Action, Plan};

fn arb_safe_path() -> impl Strategy<Value = String> {
    "/(home|tmp|etc|var)/[a-z]{1,8}(\\.[a-z]{1,3})?"
}

fn arb_token() -> impl Strategy<Value = String> {
    "[a-z0-9_.-]{1,8}"
}

/// Commands built from tokens that can never spell a destructive pattern
fn arb_safe_command() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_token(), 1..5).prop_filter("no destructive substring", |tokens| {
        let joined = tokens.join(" ");
        !DESTRUCTIVE_PATTERNS.iter().any(|p| joined.contains(*p))
    })
}

fn arb_safe_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        ("[a-z][a-z0-9-]{0,12}", any::<bool>()).prop_map(|(package, needs_root)| {
            Action::InstallPackage {
                package,
                needs_root,
            }
        }),
        ("[a-z][a-z0-9-]{0,12}", any::<bool>()).prop_map(|(package, needs_root)| {
            Action::RemovePackage {
                package,
                needs_root,
            }
        }),
        (arb_safe_path(), any::<bool>())
            .prop_map(|(path, needs_root)| Action::ReadFile { path, needs_root }),
        (arb_safe_path(), ".{0,20}").prop_map(|(path, content)| Action::CreateFile {
            path,
            content: Some(content),
            needs_root: false,
        }),
        (arb_safe_path(), ".{0,20}").prop_map(|(path, content)| Action::EditFile {
            path,
            content: Some(content),
            diff: None,
            needs_root: false,
        }),
        arb_safe_command().prop_map(|command| Action::RunCommand {
            command,
            needs_root: false,
        }),
    ]
}

fn arb_bad_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::InstallPackage {
            package: String::new(),
            needs_root: false
        }),
        Just(Action::RemovePackage {
            package: String::new(),
            needs_root: true
        }),
        Just(Action::ReadFile {
            path: String::new(),
            needs_root: false
        }),
        prop::sample::select(PROTECTED_PATHS).prop_map(|p| Action::EditFile {
            path: p.to_string(),
            content: Some("x".to_string()),
            diff: None,
            needs_root: true,
        }),
        prop::sample::select(PROTECTED_PATHS).prop_map(|p| Action::CreateFile {
            path: p.to_string(),
            content: None,
            needs_root: false,
        }),
        Just(Action::RunCommand {
            command: vec![],
            needs_root: false
        }),
        (arb_token(), prop::sample::select(DESTRUCTIVE_PATTERNS)).prop_map(|(prefix, pattern)| {
            let mut command = vec![prefix];
            command.extend(pattern.split(' ').map(str::to_string));
            command.push("/dev/sda1".to_string());
            Action::RunCommand {
                command,
                needs_root: true,
            }
        }),
        "[a-z_]{3,12}"
            .prop_filter("not a known kind", |k| {
                !systemai_common::action::KNOWN_ACTION_TYPES.contains(&k.as_str())
            })
            .prop_map(|kind| Action::Unknown { kind }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn safe_plans_are_accepted(actions in prop::collection::vec(arb_safe_action(), 0..8)) {
        let plan = Plan::new(actions, "generated");
        prop_assert!(validate(&plan).is_ok());
    }

    #[test]
    fn first_violation_is_reported(
        prefix in prop::collection::vec(arb_safe_action(), 0..6),
        bad in arb_bad_action(),
        suffix in prop::collection::vec(prop_oneof![arb_safe_action(), arb_bad_action()], 0..6),
    ) {
        let index = prefix.len();
        let mut actions = prefix;
        actions.push(bad);
        actions.extend(suffix);

        let err = validate(&Plan::new(actions, "generated")).unwrap_err();
        prop_assert_eq!(err.index, index);
    }

    #[test]
    fn validation_is_deterministic(actions in prop::collection::vec(
        prop_oneof![arb_safe_action(), arb_bad_action()], 0..10
    )) {
        let plan = Plan::new(actions, "generated");
        prop_assert_eq!(validate(&plan), validate(&plan));
    }

    #[test]
    fn protected_paths_rejected_for_every_file_kind(
        path in prop::sample::select(PROTECTED_PATHS),
        needs_root in any::<bool>(),
    ) {
        let actions = [
            Action::ReadFile { path: path.to_string(), needs_root },
            Action::EditFile { path: path.to_string(), content: None, diff: Some("d".into()), needs_root },
            Action::CreateFile { path: path.to_string(), content: None, needs_root },
        ];
        for action in &actions {
            let reason = check_action(action).unwrap_err();
            prop_assert!(reason.contains("protected path"));
        }
    }
}

#[test]
fn violations_at_two_and_five_report_two() {
    let ok = || Action::ReadFile {
        path: "/etc/hosts".to_string(),
        needs_root: false,
    };
    let actions = vec![
        ok(),
        ok(),
        Action::InstallPackage {
            package: String::new(),
            needs_root: false,
        },
        ok(),
        ok(),
        Action::RunCommand {
            command: vec!["mkfs.ext4".to_string(), "/dev/sda1".to_string()],
            needs_root: true,
        },
    ];

    let err = validate(&Plan::new(actions, "two bad")).unwrap_err();
    assert_eq!(err.index, 2);
    assert_eq!(err.to_string(), "action 2: empty package name");
}

#[test]
fn near_protected_paths_are_allowed() {
    for path in ["/boot/grub/grub.cfg", "/devices", "/etc", "/dev/"] {
        let action = Action::ReadFile {
            path: path.to_string(),
            needs_root: false,
        };
        assert!(check_action(&action).is_ok(), "{} should be allowed", path);
    }
}

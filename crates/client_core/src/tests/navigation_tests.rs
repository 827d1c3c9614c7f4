use super::*;
use crate::typed_value::TypedKind;

fn node(name: &str) -> CommandNode {
    CommandNode::new(name, false).expect("node")
}

fn integer(name: &str, value: i64) -> TypedValue {
    TypedValue::new(
        name,
        TypedKind::Integer {
            value,
            bounds: Default::default(),
        },
    )
    .expect("value")
}

fn navigator_with_modules(names: &[&str]) -> Navigator {
    let mut nav = Navigator::new();
    let ticket = nav.begin_root_load();
    assert!(nav.apply_commands(&ticket, Ok(names.iter().map(|name| node(name)).collect())));
    assert!(nav.apply_variables(&ticket, Ok(vec![integer("verbosity", 1)])));
    nav
}

#[test]
fn root_load_populates_both_root_collections() {
    let nav = navigator_with_modules(&["rf", "mac"]);
    assert_eq!(nav.state(), NavState::Root);
    assert_eq!(nav.modules().state(), &LoadState::Ready);
    assert_eq!(nav.modules().items().len(), 2);
    assert_eq!(nav.root_variables().items()[0].name(), "verbosity");
}

#[test]
fn select_module_issues_module_scoped_ticket() {
    let mut nav = navigator_with_modules(&["rf"]);
    let ticket = nav.select_module("rf").expect("select");

    assert_eq!(ticket.level, Level::Module);
    assert_eq!(ticket.scope.to_string(), "rf");
    assert_eq!(nav.state(), NavState::ModuleSelected);
    assert!(nav.commands().is_loading());
    assert!(nav.module_variables().is_loading());
}

#[test]
fn selecting_unknown_module_is_rejected() {
    let mut nav = navigator_with_modules(&["rf"]);
    assert!(matches!(
        nav.select_module("phy"),
        Err(PanelError::NotFound { level: Level::Module, .. })
    ));
    assert_eq!(nav.state(), NavState::Root);
}

#[test]
fn command_selection_requires_a_module() {
    let mut nav = navigator_with_modules(&["rf"]);
    assert!(matches!(
        nav.select_command("tx"),
        Err(PanelError::NoSelection(Level::Module))
    ));
}

#[test]
fn stale_module_listing_is_discarded() {
    let mut nav = navigator_with_modules(&["a", "b"]);
    let ticket_a = nav.select_module("a").expect("a");
    let ticket_b = nav.select_module("b").expect("b");

    assert!(nav.apply_commands(&ticket_b, Ok(vec![node("b_cmd")])));
    assert!(!nav.apply_commands(&ticket_a, Ok(vec![node("a_cmd")])));
    assert!(!nav.apply_variables(&ticket_a, Ok(vec![integer("a_var", 1)])));

    assert_eq!(nav.commands().items()[0].name(), "b_cmd");
    assert!(nav.module_variables().is_loading());
    assert_eq!(nav.selected_module().map(CommandNode::name), Some("b"));
}

#[test]
fn reselecting_module_clears_command_and_arguments() {
    let mut nav = navigator_with_modules(&["rf"]);
    let module_ticket = nav.select_module("rf").expect("rf");
    nav.apply_commands(&module_ticket, Ok(vec![node("tx")]));
    let command_ticket = nav.select_command("tx").expect("tx");
    nav.apply_variables(&command_ticket, Ok(vec![integer("power", 3)]));
    assert_eq!(nav.state(), NavState::CommandSelected);
    assert_eq!(nav.arguments().len(), 1);

    nav.select_module("rf").expect("reselect");
    assert_eq!(nav.state(), NavState::ModuleSelected);
    assert!(nav.selected_command().is_none());
    assert!(nav.arguments().is_empty());
    assert_eq!(nav.arguments_state(), &LoadState::Idle);
    assert!(!nav.apply_variables(&command_ticket, Ok(vec![integer("power", 9)])));
}

#[test]
fn root_reload_discards_deeper_state() {
    let mut nav = navigator_with_modules(&["rf"]);
    let module_ticket = nav.select_module("rf").expect("rf");
    nav.begin_root_load();

    assert_eq!(nav.state(), NavState::Root);
    assert!(!nav.apply_commands(&module_ticket, Ok(vec![node("tx")])));
    assert!(nav.commands().items().is_empty());
}

#[test]
fn failed_fetch_degrades_to_empty_listing() {
    let mut nav = navigator_with_modules(&["rf"]);
    let ticket = nav.select_module("rf").expect("rf");
    assert!(nav.apply_commands(&ticket, Err(PanelError::Transport("timed out".into()))));
    assert!(nav.apply_variables(&ticket, Ok(vec![integer("gain", 10)])));

    assert!(nav.commands().items().is_empty());
    assert_eq!(nav.commands().error(), Some("transport failure: timed out"));
    assert_eq!(nav.module_variables().items().len(), 1);
    assert_eq!(nav.selected_module().map(CommandNode::name), Some("rf"));
}

#[test]
fn argument_listing_fills_selected_command() {
    let mut nav = navigator_with_modules(&["rf"]);
    let module_ticket = nav.select_module("rf").expect("rf");
    nav.apply_commands(&module_ticket, Ok(vec![node("tx")]));
    let ticket = nav.select_command("tx").expect("tx");
    assert_eq!(ticket.scope.to_string(), "rf/tx");

    nav.apply_variables(&ticket, Ok(vec![integer("x", 1), integer("y", 2)]));
    nav.edit_argument("y", "5").expect("edit");
    assert!(nav.edit_argument("y", "five").is_err());

    let (command, scope) = nav.command_for_submit().expect("submit");
    assert_eq!(scope.to_string(), "rf");
    let payload = command.build_invocation_payload().expect("payload");
    let args: Vec<&str> = payload.args.iter().map(|arg| arg.as_str()).collect();
    assert_eq!(args, ["1", "5"]);
}

#[test]
fn duplicate_argument_listing_marks_arguments_failed() {
    let mut nav = navigator_with_modules(&["rf"]);
    let module_ticket = nav.select_module("rf").expect("rf");
    nav.apply_commands(&module_ticket, Ok(vec![node("tx")]));
    let ticket = nav.select_command("tx").expect("tx");

    assert!(nav.apply_variables(&ticket, Ok(vec![integer("x", 1), integer("x", 2)])));
    assert!(matches!(nav.arguments_state(), LoadState::Failed(_)));
    assert!(nav.arguments().is_empty());
}

#[test]
fn edits_target_the_requested_level() {
    let mut nav = navigator_with_modules(&["rf"]);
    nav.edit_variable(Level::Root, "verbosity", "4").expect("edit");
    assert_eq!(
        nav.variable(Level::Root, "verbosity").map(TypedValue::value_text),
        Some("4".to_string())
    );
    assert!(nav.edit_variable(Level::Module, "verbosity", "4").is_err());
}

fn navigator_with_command(command: CommandNode) -> (Navigator, FetchTicket) {
    let mut nav = navigator_with_modules(&["rf"]);
    let module_ticket = nav.select_module("rf").expect("rf");
    assert!(nav.apply_commands(&module_ticket, Ok(vec![command])));
    let ticket = nav.select_command("tx").expect("tx");
    (nav, ticket)
}

fn tx_with_inline_argument() -> CommandNode {
    let mut tx = node("tx");
    tx.replace_arguments(vec![integer("stale", 7)]).expect("args");
    tx
}

#[test]
fn command_cannot_be_submitted_while_arguments_load() {
    let (nav, _ticket) = navigator_with_command(tx_with_inline_argument());

    assert!(nav.arguments().is_empty());
    assert!(matches!(
        nav.command_for_submit(),
        Err(PanelError::ArgumentsUnavailable { ref command, ref reason })
            if command == "tx" && reason == "still loading"
    ));
}

#[test]
fn failed_argument_listing_blocks_submission() {
    let (mut nav, ticket) = navigator_with_command(tx_with_inline_argument());

    assert!(nav.apply_variables(&ticket, Err(PanelError::Transport("timed out".into()))));
    assert_eq!(
        nav.arguments_state(),
        &LoadState::Failed("transport failure: timed out".to_string())
    );
    assert!(nav.arguments().is_empty());
    assert!(matches!(
        nav.command_for_submit(),
        Err(PanelError::ArgumentsUnavailable { .. })
    ));
    assert_eq!(nav.selected_module().map(CommandNode::name), Some("rf"));
}

#[test]
fn scopes_keep_names_verbatim() {
    let mut nav = navigator_with_modules(&[" rf"]);
    let ticket = nav.select_module(" rf").expect("select");
    assert_eq!(ticket.scope.segments(), [" rf".to_string()]);

    nav.apply_commands(&ticket, Ok(vec![node("tx ")]));
    let ticket = nav.select_command("tx ").expect("tx");
    assert_eq!(
        ticket.scope.segments(),
        [" rf".to_string(), "tx ".to_string()]
    );
    assert_eq!(
        nav.scope_for(Level::Module).expect("scope").segments(),
        [" rf".to_string()]
    );
}

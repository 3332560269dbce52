mod common;

use common::Recorder;
use linecmd::Command;

type Cmd = Command<()>;

#[test]
fn shows_command_description() {
    let mut root = Cmd::new();
    root.command("test").unwrap().description("test command description");
    assert!(root.help().contains("test command description"));
}

#[test]
fn usage_line_can_be_replaced() {
    let mut root = Cmd::new();
    root.usage("[custom options] //test");
    root.command("test").unwrap();
    assert!(root.help().contains("  Usage:  [custom options] //test\n"));
}

#[test]
fn shows_commands_with_their_arguments() {
    let commands = [
        "test1",
        "test2 [option] [option]",
        "test3 <option>",
        "test4 <option> [option]",
        "test5 <option> [options...]",
        "test6 <\"test test\"> ['test2 test3']",
    ];
    let mut root = Cmd::new();
    for decl in commands {
        root.command(decl).unwrap();
    }
    let help = root.help();
    for decl in commands {
        assert!(help.contains(decl), "missing {decl} in\n{help}");
    }
}

#[test]
fn shows_alias_next_to_name() {
    let mut root = Cmd::new();
    root.command("test").unwrap().alias("test2");
    assert!(root.help().contains("test|test2"));
    assert!(root.find_command("test").unwrap().help().contains("test|test2"));
}

#[test]
fn shows_declared_arguments() {
    let mut root = Cmd::new();
    root.command("test <param1> <param2> [param3]").unwrap();
    assert!(root.help().contains("test <param1> <param2> [param3]"));
}

#[test]
fn shows_options_and_their_descriptions() {
    let flags = [
        "-s --size <size>",
        "-d --drink [drink]",
        "-p",
        "--test",
        "-o --option",
        "-N --no-test",
    ];
    let mut root = Cmd::new();
    for flag in flags {
        root.option(flag, "option description");
    }
    let help = root.help();
    for flag in flags {
        assert!(help.contains(flag), "missing {flag}");
    }
    assert!(help.contains("option description"));
}

#[test]
fn always_shows_the_help_option() {
    assert!(Cmd::new().help().contains("-h, --help"));
}

#[test]
fn help_command_appears_with_the_first_command() {
    let mut root = Cmd::new();
    assert!(!root.help().contains("help [cmd]"));
    assert!(!root.help().contains("display help for [cmd]"));

    root.command("test").unwrap();
    assert!(root.help().contains("help [cmd]"));
    assert!(root.help().contains("display help for [cmd]"));
}

#[test]
fn subcommands_stay_out_of_the_parent_help() {
    let mut root = Cmd::new();
    let test = root.command("test").unwrap();
    test.command("sub1").unwrap();
    test.command("sub2").unwrap();

    let help = root.help();
    assert!(help.contains("test"));
    assert!(!help.contains("sub1"));
    assert!(!help.contains("sub2"));
}

#[test]
fn help_command_sends_exactly_the_rendered_help() {
    let out = Recorder::default();
    let mut root = Cmd::new();
    root.command("pizza")
        .unwrap()
        .alias("order")
        .option("-s --size <size>", "Pizza size")
        .option("-d --drink [drink]", "Drink")
        .description("Order your pizza");
    out.attach(&mut root);

    root.parse("help", &());
    assert_eq!(out.items(), vec![root.help()]);
}

#[test]
fn help_flag_and_help_command_agree() {
    let out = Recorder::default();
    let mut root = Cmd::new();
    root.command("pizza").unwrap();
    out.attach(&mut root);

    root.parse("-h", &());
    root.parse("help", &());
    assert_eq!(out.items(), vec![root.help(), root.help()]);
}

#[test]
fn command_help_by_flag_or_help_command() {
    let out = Recorder::default();
    let mut root = Cmd::new();
    root.command("pizza").unwrap().option("-s, --size <size>", "Pizza size");
    out.attach(&mut root);

    root.parse("pizza -h", &());
    root.parse("help pizza", &());
    root.parse("pizza --help", &());
    let pizza_help = root.find_command("pizza").unwrap().help();
    assert_eq!(out.items(), vec![pizza_help.clone(), pizza_help.clone(), pizza_help]);
}

#[test]
fn help_for_a_command_with_an_action_skips_the_action() {
    let out = Recorder::default();
    let mut root = Cmd::new();
    root.command("test <required>")
        .unwrap()
        .action(|_| panic!("should not be called"));
    out.attach(&mut root);

    root.parse("help test", &());
    root.parse("test -h", &());
    let help = root.find_command("test").unwrap().help();
    assert_eq!(out.items(), vec![help.clone(), help]);
}

#[test]
fn nested_help_command() {
    let out = Recorder::default();
    let mut root = Cmd::new();
    root.command("group").unwrap().command("sub <x>").unwrap().description("nested");
    out.attach(&mut root);

    root.parse("help group sub", &());
    let sub = root.find_command("group").unwrap().find_command("sub").unwrap();
    assert_eq!(out.items(), vec![sub.help()]);
}

use ios_lab_sim::cliconfig::TranscriptKind;
use ios_lab_sim::{
    process_input, LabEngine, LabScenario, MemoryStore, Mode, Session, SessionStore,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn run(session: &mut Session, lab: &LabScenario, lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .map(|line| process_input(session, lab, line).output)
        .collect()
}

fn core_lab() -> LabScenario {
    LabScenario::from_json(
        r#"{
            "title": "Core router",
            "success_criteria": {
                "R1": {
                    "hostname": "CORE",
                    "config_checks": [
                        {"path": ["interfaces", "Fa0/0", "status"], "value": "up"}
                    ]
                }
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn hostname_shows_up_in_running_config() {
    init_logging();
    let lab = LabScenario::default();
    let mut session = Session::new("s1");
    let out = run(
        &mut session,
        &lab,
        &["configure terminal", "hostname R1-EDGE", "end", "show running-config"],
    );
    assert!(out[3].lines().any(|line| line == "hostname R1-EDGE"));
    assert_eq!(session.devices["R1"].prompt(), "R1-EDGE#");
}

#[test]
fn configured_interface_is_listed_up_in_brief_table() {
    init_logging();
    let lab = LabScenario::default();
    let mut session = Session::new("s1");
    let out = run(
        &mut session,
        &lab,
        &[
            "conf t",
            "int fa0/0",
            "ip address 10.0.0.1 255.255.255.0",
            "no shutdown",
            "end",
            "show ip interface brief",
        ],
    );
    let row = out[5]
        .lines()
        .find(|line| line.starts_with("FastEthernet0/0"))
        .unwrap();
    let columns: Vec<&str> = row.split_whitespace().collect();
    assert_eq!(columns, vec!["FastEthernet0/0", "10.0.0.1", "YES", "up", "up"]);
}

#[test]
fn completion_needs_every_condition_and_sticks() {
    init_logging();
    let lab = core_lab();
    let mut session = Session::new("s1");

    let r = process_input(&mut session, &lab, "conf t");
    assert!(!r.completed);
    let r = process_input(&mut session, &lab, "hostname CORE");
    assert!(!r.completed);
    let r = process_input(&mut session, &lab, "hostname R1");
    assert!(!r.completed);
    process_input(&mut session, &lab, "interface fa0/0");
    let r = process_input(&mut session, &lab, "no shutdown");
    assert!(!r.completed, "hostname was changed back");
    process_input(&mut session, &lab, "exit");
    let r = process_input(&mut session, &lab, "hostname core");
    assert!(r.completed);
    assert_eq!(r.hostname, "core");

    let r = process_input(&mut session, &lab, "interface fa0/0");
    assert!(r.completed);
    let r = process_input(&mut session, &lab, "shutdown");
    assert!(r.completed);
    assert!(session.is_completed);
}

#[test]
fn mode_round_trip_restores_the_prompt() {
    let lab = LabScenario::default();
    let mut session = Session::new("s1");
    let before = process_input(&mut session, &lab, "").prompt;
    let inside = process_input(&mut session, &lab, "configure terminal");
    assert_eq!(inside.prompt, "R1(config)#");
    assert_eq!(inside.mode, Mode::GlobalConfig);
    let after = process_input(&mut session, &lab, "end");
    assert_eq!(after.prompt, before);
    assert_eq!(after.mode, Mode::Privileged);
}

#[test]
fn sub_modes_show_their_prompts() {
    let lab = LabScenario::default();
    let mut session = Session::new("s1");
    let prompts: Vec<String> = [
        "conf t",
        "int f0/1",
        "line vty 0 4",
        "exit",
        "line vty 0 4",
        "crypto isakmp policy 10",
        "exit",
        "crypto isakmp policy 10",
        "exit",
        "exit",
    ]
    .iter()
    .map(|line| process_input(&mut session, &lab, line).prompt)
    .collect();
    // `line` is a global command, so it is rejected inside interface mode.
    assert_eq!(
        prompts,
        vec![
            "R1(config)#",
            "R1(config-if)#",
            "R1(config-if)#",
            "R1(config)#",
            "R1(config-line)#",
            "R1(config-line)#",
            "R1(config)#",
            "R1(config-isakmp)#",
            "R1(config)#",
            "R1#",
        ]
    );
}

#[test]
fn rejected_commands_are_still_transcribed() {
    let lab = LabScenario::default();
    let mut session = Session::new("s1");
    let r = process_input(&mut session, &lab, "bogus command");
    assert_eq!(r.output, "% Invalid input detected.");
    let device = &session.devices["R1"];
    assert_eq!(device.history, vec!["bogus command"]);
    let kinds: Vec<TranscriptKind> = device.transcript.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![TranscriptKind::Command, TranscriptKind::Output]);
}

#[test]
fn ipsec_phase_one_lab() {
    let lab = LabScenario::from_json(
        r#"{"success_criteria": {"R1": {"config_checks": [
            {"path": ["isakmp_policies", "10", "encryption"], "value": "aes"},
            {"path": ["isakmp_policies", "10", "authentication"], "value": "pre-share"},
            {"path": ["isakmp_policies", "10", "group"], "value": 5}
        ]}}}"#,
    )
    .unwrap();
    let mut session = Session::new("s1");
    let out = run(
        &mut session,
        &lab,
        &["conf t", "cry isa pol 10", "encr aes", "auth pre", "gr 5", "do sh cry isa pol"],
    );
    assert!(out[5].contains("Protection suite of priority 10"));
    assert!(session.is_completed);
}

#[test]
fn engine_persists_between_calls() {
    init_logging();
    let mut engine = LabEngine::new(MemoryStore::new(), core_lab());
    engine.start_session("s1").unwrap();
    for line in ["conf t", "hostname CORE", "int fa0/0", "no shut"] {
        engine.process("s1", line).unwrap();
    }
    let stored = engine.store().load("s1").unwrap();
    assert!(stored.is_completed);
    assert_eq!(stored.devices["R1"].mode, Mode::InterfaceConfig);
    assert_eq!(stored.devices["R1"].history.len(), 4);

    let view = engine.reset("s1").unwrap();
    assert_eq!(view.prompt, "R1#");
    let stored = engine.store().load("s1").unwrap();
    assert!(!stored.is_completed);
    assert!(stored.devices["R1"].history.is_empty());
}

#[test]
fn engine_rejects_devices_outside_the_lab() {
    let mut engine = LabEngine::new(MemoryStore::new(), LabScenario::default());
    engine.start_session("s1").unwrap();
    assert!(engine.switch_device("s1", "R2").is_err());
    let view = engine.switch_device("s1", "R1").unwrap();
    assert_eq!(view.transcript[0].text, "Switched to R1 (router).");
    engine.process("s1", "conf t").unwrap();
    let view = engine.switch_device("s1", "R1").unwrap();
    assert_eq!(view.prompt, "R1(config)#");
    assert_eq!(view.transcript[0].text, "conf t");
}

#![cfg(unix)]

mod common;

use std::io::{Read, Write};
use std::time::Duration;

use common::{has_script, wait_for, wait_timeout, Monorepo};

const TIMEOUT: Duration = Duration::from_secs(20);

#[test]
fn child_owns_the_terminal() {
    if !has_script() {
        eprintln!("skipping: util-linux `script` not installed");
        return;
    }
    let repo = Monorepo::with_dev_ports(&[("web", 0)]);
    // Both calls stop a background job with SIGTTOU / SIGTTIN.
    repo.stub_runner("stty sane </dev/tty\nread line </dev/tty\necho \"GOT:$line\"\nexit 5");

    let mut script = repo.devports_on_pty(24200).spawn().unwrap();
    let mut input = script.stdin.take().unwrap();
    input.write_all(b"hello\n").unwrap();
    input.flush().unwrap();

    let status = wait_timeout(&mut script, TIMEOUT);
    drop(input);
    let mut output = String::new();
    script.stdout.take().unwrap().read_to_string(&mut output).unwrap();

    assert_eq!(status.code(), Some(5), "terminal output: {output}");
    assert!(output.contains("GOT:hello"), "terminal output: {output}");
}

#[test]
fn repeated_ctrl_c_reaches_child() {
    if !has_script() {
        eprintln!("skipping: util-linux `script` not installed");
        return;
    }
    let repo = Monorepo::with_dev_ports(&[("web", 0)]);
    repo.stub_runner(
        "n=0\n\
         trap 'n=$((n + 1)); echo $n > interrupts; [ $n -ge 2 ] && exit 7' INT\n\
         touch started\n\
         while :; do sleep 0.05; done",
    );

    let mut script = repo.devports_on_pty(24300).spawn().unwrap();
    let mut input = script.stdin.take().unwrap();
    wait_for(&repo.path("started"));

    // ^C typed at the terminal.
    input.write_all(b"\x03").unwrap();
    input.flush().unwrap();
    wait_for(&repo.path("interrupts"));
    input.write_all(b"\x03").unwrap();
    input.flush().unwrap();

    let status = wait_timeout(&mut script, TIMEOUT);
    drop(input);
    assert_eq!(status.code(), Some(7));
    assert_eq!(repo.read("interrupts").trim(), "2");
}

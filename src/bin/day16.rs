use std::io;
use std::io::prelude::*;

use tracing::{event, Level};
use tracing_subscriber::prelude::*;

use packet_decoder::hex::bits_from_hex;
use packet_decoder::{decode_single, evaluate, sum_versions, FormatError, Packet};

fn parse_transmission(line: &str) -> Result<Packet, FormatError> {
    let bits = bits_from_hex(line)?;
    decode_single(&bits)
}

fn part1(packet: &Packet) -> u64 {
    sum_versions(packet)
}

fn part2(packet: &Packet) -> u64 {
    evaluate(packet)
}

#[test]
fn test_part1() {
    let packet = parse_transmission("A0016C880162017C3686B18A3D4780\n").expect("valid test data");
    assert_eq!(part1(&packet), 31);
}

#[test]
fn test_part2() {
    let packet = parse_transmission("9C0141080250320F1802104A08").expect("valid test data");
    assert_eq!(part2(&packet), 1);
    assert!(parse_transmission("9C01Q").is_err());
}

fn main() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter_layer = match tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))
    {
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
        Ok(layer) => layer,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let mut input = String::new();
    match io::stdin().read_to_string(&mut input) {
        Ok(_) => (),
        Err(e) => {
            eprintln!("failed to read input: {}", e);
            std::process::exit(1);
        }
    }
    let mut failed = false;
    for (lineno, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_transmission(line) {
            Ok(packet) => {
                event!(Level::DEBUG, "line {}: {}", lineno + 1, packet);
                println!("Day 16 part 1: version sum = {}", part1(&packet));
                println!("Day 16 part 2: value = {}", part2(&packet));
            }
            Err(e) => {
                eprintln!("line {}: {}", lineno + 1, e);
                failed = true;
            }
        }
    }
    if failed {
        std::process::exit(1);
    }
}

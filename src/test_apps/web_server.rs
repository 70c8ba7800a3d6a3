//
// Copyright 2025 Jeff Bush
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use log::{Level, LevelFilter, Metadata, Record};
use netup::ipcfg::IpSetting;
use netup::netif::{BringUpConfig, Netif};
use netup::poll::RetryBudget;
use netup::sim::{Journal, SimManager, SimStack};
use std::io::{Read, Write};
use std::net::{Ipv4Addr, TcpListener, TcpStream};

const PORT: u16 = 8080;

// One formatted line per record, straight to stdout. The console is the
// only sink this platform has.
struct ConsoleLog;

impl log::Log for ConsoleLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLog = ConsoleLog;

fn main() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }

    // Simulated subsystems with a plausible negotiation script: the link is
    // up on the third poll and the lease lands on the second.
    let journal = Journal::new();
    let mut manager = SimManager::new(journal.clone());
    manager.link_up_after = 2;
    let mut stack = SimStack::new(journal.clone());
    stack.dhcp_bound_after = 1;
    stack.lease = (
        Ipv4Addr::new(192, 168, 0, 10),
        Ipv4Addr::new(255, 255, 255, 0),
        Ipv4Addr::new(192, 168, 0, 1),
    );

    let config = BringUpConfig {
        ip: IpSetting::Dhcp,
        link_wait: RetryBudget::new(10, 250),
        dhcp_wait: RetryBudget::new(10, 250),
        ..BringUpConfig::default()
    };

    let mut netif = Netif::new(manager, stack, config);
    if let Err(err) = netif.bring_up() {
        println!("Network bring-up failed: {}", err);
        std::process::exit(1);
    }

    match netif.ip() {
        Ok(addr) => println!("Interface bound to {}", addr),
        Err(err) => println!("Could not read the bound address: {}", err),
    }

    let listener = TcpListener::bind(("0.0.0.0", PORT));
    if listener.is_err() {
        println!("Failed to open socket: {}", listener.err().unwrap());
        return;
    }

    println!("Listening on port {}", PORT);

    let mut hits = 0u32;
    for stream in listener.unwrap().incoming() {
        if stream.is_err() {
            println!("Failed to accept connection: {}", stream.err().unwrap());
            return;
        }

        hits += 1;
        handle_request(stream.unwrap(), hits);
    }
}

fn handle_request(mut stream: TcpStream, hits: u32) {
    let mut data = [0; 1500];
    let received = stream.read(&mut data);
    if received.is_err() {
        println!("Connection closed");
        return;
    }

    let request = std::str::from_utf8(&data[..received.unwrap()]);
    if request.is_err() {
        println!("Failed to parse request");
        return;
    }

    println!(
        "Received request {}: {}",
        hits,
        request.unwrap().lines().next().unwrap_or("")
    );

    let body = format!(
        "<html><body><h1>Hello from the console!</h1><p>{} requests served.</p></body></html>",
        hits
    );
    let response = format!(
        "HTTP/1.0 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    if stream.write_all(response.as_bytes()).is_err() {
        println!("Failed to send response");
    }
}

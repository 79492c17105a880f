//! Console command table.
//!
//! Each entry maps a command name to a plain `fn` handler. Handlers
//! write their reply into a fixed-capacity [`Response`] and return an
//! error only to let the caller log it; the reply text already tells the
//! peer what went wrong.

use core::fmt::Write;

use crate::app::ports::Platform;
use crate::error::CommandError;

/// Reply capacity. Large enough for the full `help` listing.
pub const RESPONSE_CAPACITY: usize = 512;

pub type Response = heapless::String<RESPONSE_CAPACITY>;

/// What a handler can reach.
pub struct CommandContext<'a> {
    pub platform: &'a mut dyn Platform,
    /// Peers currently linked.
    pub connections: usize,
    /// Set by `reset`; the caller reboots after the reply is out.
    pub reset_requested: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(platform: &'a mut dyn Platform, connections: usize) -> Self {
        Self {
            platform,
            connections,
            reset_requested: false,
        }
    }
}

pub type CommandHandler =
    fn(&mut CommandContext<'_>, &str, &mut Response) -> Result<(), CommandError>;

pub struct CommandEntry {
    pub name: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

pub static COMMANDS: [CommandEntry; 9] = [
    CommandEntry {
        name: "help",
        help: "Show available commands",
        handler: cmd_help,
    },
    CommandEntry {
        name: "status",
        help: "Show system status",
        handler: cmd_status,
    },
    CommandEntry {
        name: "battery",
        help: "Show battery status",
        handler: cmd_battery,
    },
    CommandEntry {
        name: "temp",
        help: "Show temperature",
        handler: cmd_temp,
    },
    CommandEntry {
        name: "info",
        help: "Show system information",
        handler: cmd_info,
    },
    CommandEntry {
        name: "uptime",
        help: "Show system uptime",
        handler: cmd_uptime,
    },
    CommandEntry {
        name: "reset",
        help: "Reset the system",
        handler: cmd_reset,
    },
    CommandEntry {
        name: "led",
        help: "Control LED (on|off|toggle)",
        handler: cmd_led,
    },
    CommandEntry {
        name: "echo",
        help: "Echo back the arguments",
        handler: cmd_echo,
    },
];

/// First entry whose name matches exactly.
pub fn lookup(name: &str) -> Option<&'static CommandEntry> {
    COMMANDS.iter().find(|entry| entry.name == name)
}

// ── Handlers ──────────────────────────────────────────────────

fn cmd_help(_: &mut CommandContext<'_>, _args: &str, out: &mut Response) -> Result<(), CommandError> {
    let _ = out.push_str("Available commands:\n");
    for entry in &COMMANDS {
        let _ = writeln!(out, "  {} - {}", entry.name, entry.help);
    }
    Ok(())
}

fn cmd_status(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    let uptime = ctx.platform.uptime_ms();
    let _ = out.push_str("=== System Status ===\n");
    let _ = writeln!(
        out,
        "Uptime: {}.{:03} seconds\nBLE connections: {}",
        uptime / 1000,
        uptime % 1000,
        ctx.connections
    );
    // Unavailable readings are left out rather than failing the command.
    if let Ok(battery) = ctx.platform.battery_status() {
        let _ = writeln!(
            out,
            "Battery: {}% ({} mV)",
            battery.percentage, battery.voltage_mv
        );
    }
    if let Ok(celsius) = ctx.platform.temperature_celsius() {
        let _ = writeln!(out, "Temperature: {}°C", celsius);
    }
    Ok(())
}

fn cmd_battery(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    match ctx.platform.battery_status() {
        Ok(b) => {
            let _ = writeln!(
                out,
                "Battery Status:\n  Voltage: {} mV\n  Percentage: {}%\n  Present: {}\n  Charging: {}",
                b.voltage_mv,
                b.percentage,
                yes_no(b.is_present),
                yes_no(b.is_charging)
            );
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(out, "Battery status unavailable (err {})", e.code());
            Err(e.into())
        }
    }
}

fn cmd_temp(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    match ctx.platform.temperature_celsius() {
        Ok(celsius) => {
            let _ = writeln!(out, "Temperature: {}°C", celsius);
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(out, "Temperature unavailable (err {})", e.code());
            Err(e.into())
        }
    }
}

fn cmd_info(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    match ctx.platform.system_info() {
        Ok(info) => {
            let _ = writeln!(
                out,
                "System Information:\n  Board: {}\n  SoC: {}\n  Uptime: {} ms\n  Free Heap: {} bytes",
                info.board_name, info.soc_name, info.uptime_ms, info.free_heap_bytes
            );
            Ok(())
        }
        Err(e) => {
            let _ = writeln!(out, "System info unavailable (err {})", e.code());
            Err(e.into())
        }
    }
}

fn cmd_uptime(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    let secs = ctx.platform.uptime_ms() / 1000;
    let _ = writeln!(
        out,
        "Uptime: {} hours, {} minutes, {} seconds",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    Ok(())
}

fn cmd_reset(
    ctx: &mut CommandContext<'_>,
    _args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    let _ = out.push_str("Resetting system...\n");
    ctx.reset_requested = true;
    Ok(())
}

fn cmd_led(
    ctx: &mut CommandContext<'_>,
    args: &str,
    out: &mut Response,
) -> Result<(), CommandError> {
    let action = args.split_whitespace().next();
    match action {
        None => {
            let _ = out.push_str("Usage: led <on|off|toggle>\n");
            Err(CommandError::InvalidArgument)
        }
        Some("on") => {
            ctx.platform.set_indicator(true);
            let _ = out.push_str("LED turned on\n");
            Ok(())
        }
        Some("off") => {
            ctx.platform.set_indicator(false);
            let _ = out.push_str("LED turned off\n");
            Ok(())
        }
        Some("toggle") => {
            ctx.platform.toggle_indicator();
            let _ = out.push_str("LED toggled\n");
            Ok(())
        }
        Some(_) => {
            let _ = out.push_str("Invalid LED command. Use: on, off, or toggle\n");
            Err(CommandError::InvalidArgument)
        }
    }
}

fn cmd_echo(_: &mut CommandContext<'_>, args: &str, out: &mut Response) -> Result<(), CommandError> {
    if args.is_empty() {
        let _ = out.push_str("Echo: (no arguments)\n");
    } else {
        let _ = writeln!(out, "Echo: {}", args);
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

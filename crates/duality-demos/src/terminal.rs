//! The scripted SQL terminal sessions.
//!
//! Four fixed transcripts replayed line by line with per-line delays:
//! table DDL, a continuous aggregation in changelog mode, a tumbling
//! window query in append-only mode, and the equivalent Table API job.
//! Nothing is parsed or executed; the sessions exist to show what the
//! changelog encodings look like at a real SQL client.

use duality_types::{TerminalLine, TerminalLineKind};

/// A named terminal session: an ordered transcript with per-line delays.
#[derive(Debug, Clone)]
pub struct TerminalScript {
    /// Stable session name used in configuration.
    pub name: &'static str,
    /// Human-readable title (the terminal tab label).
    pub title: &'static str,
    /// The transcript lines in display order.
    pub lines: Vec<TerminalLine>,
}

const SQL_PROMPT: &str = "Flink SQL>";
const SHELL_PROMPT: &str = "$";

fn cmd(prompt: &str, text: &str, delay_ms: u64) -> TerminalLine {
    TerminalLine::command(prompt.to_owned(), text.to_owned(), delay_ms)
}

fn out(text: &str, delay_ms: u64) -> TerminalLine {
    TerminalLine::plain(TerminalLineKind::Output, text.to_owned(), delay_ms)
}

fn data(text: &str, delay_ms: u64) -> TerminalLine {
    TerminalLine::plain(TerminalLineKind::Data, text.to_owned(), delay_ms)
}

fn info(text: &str, delay_ms: u64) -> TerminalLine {
    TerminalLine::plain(TerminalLineKind::Info, text.to_owned(), delay_ms)
}

fn success(text: &str, delay_ms: u64) -> TerminalLine {
    TerminalLine::plain(TerminalLineKind::Success, text.to_owned(), delay_ms)
}

/// Creating and inspecting the `orders` table.
pub fn ddl_session() -> TerminalScript {
    TerminalScript {
        name: "ddl",
        title: "Table DDL",
        lines: vec![
            cmd(SQL_PROMPT, " CREATE TABLE orders (", 0),
            out("    order_id STRING,", 100),
            out("    user_id STRING,", 100),
            out("    amount DECIMAL(10,2),", 100),
            out("    order_time TIMESTAMP(3)", 100),
            out(") WITH ('connector' = 'kafka', ...);", 100),
            success("[INFO] Execute statement succeed.", 600),
            cmd(SQL_PROMPT, " SHOW TABLES;", 800),
            out("+------------+", 400),
            out("| table name |", 100),
            out("+------------+", 100),
            data("| orders     |", 300),
            out("+------------+", 100),
            success("1 row in set", 400),
            cmd(SQL_PROMPT, " DESCRIBE orders;", 800),
            out("+------------+----------------+------+-----+", 400),
            out("|    name    |           type | null | key |", 100),
            out("+------------+----------------+------+-----+", 100),
            data("| order_id   |         STRING | TRUE |     |", 200),
            data("| user_id    |         STRING | TRUE |     |", 200),
            data("| amount     | DECIMAL(10, 2) | TRUE |     |", 200),
            data("| order_time |   TIMESTAMP(3) | TRUE |     |", 200),
            out("+------------+----------------+------+-----+", 100),
            success("[INFO] Table created and registered in catalog", 500),
            TerminalLine::cursor(300),
        ],
    }
}

/// A continuous aggregation retrieved in changelog mode.
pub fn aggregation_session() -> TerminalScript {
    TerminalScript {
        name: "aggregation",
        title: "Continuous Aggregation",
        lines: vec![
            cmd(SQL_PROMPT, " SELECT user_id, SUM(amount) AS total, COUNT(*) AS cnt", 0),
            out("  FROM orders GROUP BY user_id;", 100),
            info("[INFO] Submitting SQL query...", 500),
            info("[INFO] Result retrieval mode: changelog", 400),
            out("+---------+--------+-----+", 600),
            out("| user_id |  total | cnt |", 100),
            out("+---------+--------+-----+", 100),
            data("|      +I |  Alice |  100 |  1 |", 800),
            data("|      +I |    Bob |   50 |  1 |", 600),
            data("|      -U |  Alice |  100 |  1 |  <- retract old", 700),
            data("|      +U |  Alice |  250 |  2 |  <- update new", 200),
            data("|      +I |Charlie |  300 |  1 |", 800),
            data("|      -U |    Bob |   50 |  1 |", 600),
            data("|      +U |    Bob |  120 |  2 |", 200),
            out("+---------+--------+-----+", 400),
            info("[INFO] Continuous query running...", 300),
            TerminalLine::cursor(300),
        ],
    }
}

/// A tumbling-window aggregation retrieved in append-only mode.
pub fn window_session() -> TerminalScript {
    TerminalScript {
        name: "window",
        title: "Windowed Aggregation",
        lines: vec![
            cmd(SQL_PROMPT, " SELECT window_start, window_end, user_id, SUM(amount)", 0),
            out("  FROM TABLE(TUMBLE(TABLE orders, DESCRIPTOR(order_time),", 100),
            out("       INTERVAL '10' MINUTES))", 100),
            out("  GROUP BY window_start, window_end, user_id;", 100),
            info("[INFO] Submitting windowed aggregation...", 500),
            info("[INFO] Result retrieval mode: append-only", 400),
            out("+---------------------+---------------------+---------+-------+", 600),
            out("|        window_start |          window_end | user_id | total |", 100),
            out("+---------------------+---------------------+---------+-------+", 100),
            info("[INFO] Waiting for window to close...", 1000),
            data("| 2024-01-15 10:00:00 | 2024-01-15 10:10:00 |   Alice |   350 |", 800),
            data("| 2024-01-15 10:00:00 | 2024-01-15 10:10:00 |     Bob |   120 |", 400),
            data("| 2024-01-15 10:00:00 | 2024-01-15 10:10:00 | Charlie |   300 |", 400),
            info("[INFO] Window [10:00, 10:10) closed, emitting results", 600),
            data("| 2024-01-15 10:10:00 | 2024-01-15 10:20:00 |   Alice |   200 |", 1000),
            data("| 2024-01-15 10:10:00 | 2024-01-15 10:20:00 |     Bob |    75 |", 400),
            out("+---------------------+---------------------+---------+-------+", 400),
            success("[INFO] Window results are append-only (+I only)", 500),
            TerminalLine::cursor(300),
        ],
    }
}

/// The same changelog produced through the Table API.
pub fn table_api_session() -> TerminalScript {
    TerminalScript {
        name: "table-api",
        title: "Table API",
        lines: vec![
            cmd(SHELL_PROMPT, " mvn compile exec:java -Dexec.mainClass=\"TableApiDemo\"", 0),
            out("[INFO] Scanning for projects...", 400),
            out("[INFO] Building flink-table-api-demo 1.0.0", 300),
            out("[INFO] Compiling 1 source file...", 400),
            success("[INFO] BUILD SUCCESS", 500),
            info("[INFO] Starting Flink Table API job...", 600),
            out("", 100),
            out("+----+---------+--------+-----+", 600),
            out("| op | user_id |  total | cnt |", 100),
            out("+----+---------+--------+-----+", 100),
            data("| +I |   Alice |    100 |   1 |", 800),
            data("| +I |     Bob |     50 |   1 |", 600),
            data("| -U |   Alice |    100 |   1 |", 700),
            data("| +U |   Alice |    250 |   2 |", 200),
            data("| +I | Charlie |    300 |   1 |", 800),
            out("+----+---------+--------+-----+", 400),
            success("[INFO] Table API produces same changelog as SQL", 600),
            TerminalLine::cursor(300),
        ],
    }
}

/// All terminal sessions in presentation order.
pub fn all() -> Vec<TerminalScript> {
    vec![
        ddl_session(),
        aggregation_session(),
        window_session(),
        table_api_session(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sessions_are_nonempty() {
        for session in all() {
            assert!(!session.lines.is_empty(), "session {} is empty", session.name);
        }
    }

    #[test]
    fn sessions_end_with_a_cursor() {
        for session in all() {
            let last = session.lines.last();
            assert_eq!(
                last.map(|line| line.kind),
                Some(TerminalLineKind::Cursor),
                "session {} does not end with a cursor",
                session.name
            );
        }
    }

    #[test]
    fn command_lines_carry_prompts() {
        let session = ddl_session();
        for line in &session.lines {
            if line.kind == TerminalLineKind::Command {
                assert!(line.prompt.is_some());
            } else {
                assert!(line.prompt.is_none());
            }
        }
    }

    #[test]
    fn first_line_fires_immediately() {
        for session in all() {
            assert_eq!(session.lines.first().map(|line| line.delay_ms), Some(0));
        }
    }
}

//! The textual instruction grammar.
//!
//! One instruction per line, ASCII, whitespace-insensitive:
//!
//! ```text
//! begin(T1)  beginRO(T2)  R(T1,x4)  W(T1,x4,42)
//! fail(3)  recover(3)  end(T1)  dump()
//! ```

use crate::error::{Error, Result};
use crate::types::{ItemId, SiteId, TransactionId, Value, NUM_ITEMS, NUM_SITES};
use std::str::FromStr;

/// A single parsed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `begin(T#)` — start a read-write transaction.
    Begin {
        /// New transaction.
        txn: TransactionId,
    },
    /// `beginRO(T#)` — start a read-only transaction.
    BeginRo {
        /// New transaction.
        txn: TransactionId,
    },
    /// `R(T#,x#)` — read an item.
    Read {
        /// Reading transaction.
        txn: TransactionId,
        /// Item to read.
        item: ItemId,
    },
    /// `W(T#,x#,v)` — write a value to an item.
    Write {
        /// Writing transaction.
        txn: TransactionId,
        /// Target item.
        item: ItemId,
        /// New value.
        value: Value,
    },
    /// `fail(s)` — take a site down.
    Fail {
        /// Site to take down.
        site: SiteId,
    },
    /// `recover(s)` — bring a site back up.
    Recover {
        /// Site to bring back.
        site: SiteId,
    },
    /// `end(T#)` — attempt to commit a transaction.
    End {
        /// Ending transaction.
        txn: TransactionId,
    },
    /// `dump()` — report every site's current values.
    Dump,
}

impl FromStr for Instruction {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let inner = compact
            .strip_suffix(')')
            .ok_or_else(|| invalid(line, "missing closing parenthesis"))?;
        let (op, args) = inner
            .split_once('(')
            .ok_or_else(|| invalid(line, "missing opening parenthesis"))?;

        match op {
            "begin" => Ok(Instruction::Begin {
                txn: parse_txn(line, args)?,
            }),
            "beginRO" => Ok(Instruction::BeginRo {
                txn: parse_txn(line, args)?,
            }),
            "R" => {
                let (txn, item) = args
                    .split_once(',')
                    .ok_or_else(|| invalid(line, "R takes a transaction and an item"))?;
                Ok(Instruction::Read {
                    txn: parse_txn(line, txn)?,
                    item: parse_item(line, item)?,
                })
            }
            "W" => {
                let mut parts = args.splitn(3, ',');
                let txn = parts
                    .next()
                    .ok_or_else(|| invalid(line, "W takes a transaction, an item, and a value"))?;
                let item = parts
                    .next()
                    .ok_or_else(|| invalid(line, "W is missing its item"))?;
                let value = parts
                    .next()
                    .ok_or_else(|| invalid(line, "W is missing its value"))?;
                Ok(Instruction::Write {
                    txn: parse_txn(line, txn)?,
                    item: parse_item(line, item)?,
                    value: value
                        .parse::<Value>()
                        .map_err(|_| invalid(line, "value must be an integer"))?,
                })
            }
            "fail" => Ok(Instruction::Fail {
                site: parse_site(line, args)?,
            }),
            "recover" => Ok(Instruction::Recover {
                site: parse_site(line, args)?,
            }),
            "end" => Ok(Instruction::End {
                txn: parse_txn(line, args)?,
            }),
            "dump" if args.is_empty() => Ok(Instruction::Dump),
            "dump" => Err(invalid(line, "dump takes no arguments")),
            _ => Err(invalid(line, "unrecognized operation")),
        }
    }
}

fn invalid(line: &str, reason: &str) -> Error {
    Error::InvalidInstruction(format!("{reason} in {:?}", line.trim()))
}

fn parse_txn(line: &str, arg: &str) -> Result<TransactionId> {
    let digits = arg
        .strip_prefix('T')
        .ok_or_else(|| invalid(line, "transaction ids are written T<id>"))?;
    digits
        .parse::<u32>()
        .map(TransactionId)
        .map_err(|_| invalid(line, "transaction id must be an integer"))
}

fn parse_item(line: &str, arg: &str) -> Result<ItemId> {
    let digits = arg
        .strip_prefix('x')
        .ok_or_else(|| invalid(line, "item ids are written x<id>"))?;
    let id = digits
        .parse::<u32>()
        .map_err(|_| invalid(line, "item id must be an integer"))?;
    if (1..=NUM_ITEMS).contains(&id) {
        Ok(ItemId(id))
    } else {
        Err(invalid(line, "item id out of range"))
    }
}

fn parse_site(line: &str, arg: &str) -> Result<SiteId> {
    let id = arg
        .parse::<u32>()
        .map_err(|_| invalid(line, "site id must be an integer"))?;
    if (1..=NUM_SITES).contains(&id) {
        Ok(SiteId(id))
    } else {
        Err(invalid(line, "site id out of range"))
    }
}

// CLI commands

use clap::{Args, Parser, Subcommand};
use crate::{Block, BlockHeader, HexDigest, Miner, MinerConfig, MiningResult, Sha256Hasher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Parser)]
#[command(name = "pow-miner")]
#[command(about = "Proof-of-work block miner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine a single block
    Mine {
        #[command(flatten)]
        header: HeaderArgs,
        #[command(flatten)]
        search: SearchArgs,
        /// Print the mined block and search statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a block's hash is a valid proof of work
    Verify {
        /// Block index
        #[arg(long, default_value = "1")]
        index: u64,
        /// Block timestamp in Unix seconds
        #[arg(long, required_unless_present = "json")]
        timestamp: Option<u64>,
        /// Previous block hash (defaults to all zeros)
        #[arg(long)]
        previous_hash: Option<String>,
        /// Nonce recorded in the block
        #[arg(long, required_unless_present = "json")]
        nonce: Option<u64>,
        /// Hash recorded in the block
        #[arg(long, required_unless_present = "json")]
        hash: Option<String>,
        /// Required leading zero hex digits
        #[arg(short, long, default_value = "4")]
        difficulty: usize,
        /// Read the block from a JSON file written by `mine --json`
        #[arg(long, conflicts_with_all = ["timestamp", "previous_hash", "nonce", "hash"])]
        json: Option<PathBuf>,
    },

    /// Print the canonical pre-image and hash of a header
    Hash {
        #[command(flatten)]
        header: HeaderArgs,
        /// Nonce to hash with
        #[arg(long, default_value = "0")]
        nonce: u64,
    },

    /// Mine a chain of blocks in memory, starting from genesis
    Chain {
        /// Number of blocks including genesis
        #[arg(short, long, default_value = "3")]
        length: u64,
        #[command(flatten)]
        search: SearchArgs,
    },
}

/// Header fields shared by several commands
#[derive(Args, Debug, Clone)]
pub struct HeaderArgs {
    /// Block index
    #[arg(long, default_value = "1")]
    pub index: u64,
    /// Block timestamp in Unix seconds (defaults to now when mining)
    #[arg(long)]
    pub timestamp: Option<u64>,
    /// Previous block hash (defaults to all zeros)
    #[arg(long)]
    pub previous_hash: Option<String>,
}

/// Search parameters shared by mining commands
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Required leading zero hex digits
    #[arg(short, long, default_value = "4")]
    pub difficulty: usize,
    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    pub workers: Option<usize>,
    /// Search on a single thread
    #[arg(long)]
    pub sequential: bool,
    /// Give up after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u64>,
}

/// JSON document written by `mine --json`
#[derive(Serialize)]
struct MinedOutput<'a> {
    block: &'a Block,
    result: &'a MiningResult,
}

/// Accepted `verify --json` input: `mine --json` output or a bare block
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockInput {
    Mined { block: Block },
    Bare(Block),
}

/// CLI handler
pub struct CliHandler {
    /// Timestamp used when none is given on the command line
    default_timestamp: u64,
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CliHandler {
    /// Create a new CLI handler stamped with the current time
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::with_timestamp(now)
    }

    /// Create a handler with a fixed default timestamp
    pub fn with_timestamp(default_timestamp: u64) -> Self {
        Self { default_timestamp }
    }

    /// Handle CLI command
    pub fn handle(&self, cli: Cli) -> Result<(), String> {
        match cli.command {
            Commands::Mine { header, search, json } => {
                let (block, result) = self.mine_block(&header, &search)?;
                if json {
                    println!("{}", self.mined_json(&block, &result)?);
                } else {
                    self.print_result(&block, &result);
                }
                Ok(())
            }
            Commands::Verify {
                index,
                timestamp,
                previous_hash,
                nonce,
                hash,
                difficulty,
                json,
            } => {
                let block = match json {
                    Some(path) => {
                        let text = std::fs::read_to_string(&path)
                            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
                        self.load_block(&text)?
                    }
                    None => {
                        let header = HeaderArgs {
                            index,
                            timestamp,
                            previous_hash,
                        };
                        let nonce = nonce.ok_or("--nonce is required")?;
                        let hash = hash.ok_or("--hash is required")?;
                        self.solved_block(&header, nonce, &hash)?
                    }
                };
                if self.verify_block(&block, difficulty)? {
                    println!("✓ Valid proof of work at difficulty {}", difficulty);
                    Ok(())
                } else {
                    Err(format!(
                        "Block #{} does not satisfy difficulty {}",
                        block.header.index, difficulty
                    ))
                }
            }
            Commands::Hash { header, nonce } => {
                let header = self.build_header(&header).with_nonce(nonce);
                let hash = header
                    .hash_with(&Sha256Hasher)
                    .map_err(|e| e.to_string())?;
                println!("Pre-image: {}", header.canonical_string());
                println!("Hash: {}", hash);
                println!("Leading zeros: {}", hash.leading_zeros());
                Ok(())
            }
            Commands::Chain { length, search } => {
                for block in self.mine_chain(length, &search)? {
                    println!("{}", block);
                }
                Ok(())
            }
        }
    }

    /// Build a header from command line fields, nonce 0
    fn build_header(&self, args: &HeaderArgs) -> BlockHeader {
        let previous_hash = args
            .previous_hash
            .clone()
            .unwrap_or_else(|| HexDigest::zero().to_string());
        BlockHeader::new(
            args.index,
            args.timestamp.unwrap_or(self.default_timestamp),
            previous_hash,
            0,
        )
    }

    fn build_miner(&self, search: &SearchArgs) -> Miner {
        let mut config = MinerConfig {
            max_attempts: search.max_attempts,
            ..MinerConfig::default()
        };
        if let Some(workers) = search.workers {
            config.workers = workers;
        }
        Miner::new(search.difficulty).with_config(config)
    }

    fn run_search(&self, miner: &Miner, block: &mut Block, search: &SearchArgs) -> Result<MiningResult, String> {
        let result = if search.sequential {
            miner.mine(block)
        } else {
            miner.mine_parallel(block, None)
        };
        result.map_err(|e| e.to_string())
    }

    /// Mine one block from command line fields
    pub fn mine_block(&self, header: &HeaderArgs, search: &SearchArgs) -> Result<(Block, MiningResult), String> {
        let mut block = Block {
            header: self.build_header(header),
            hash: None,
        };
        let miner = self.build_miner(search);
        let result = self.run_search(&miner, &mut block, search)?;
        Ok((block, result))
    }

    /// Mine genesis plus `length - 1` successors with one miner
    pub fn mine_chain(&self, length: u64, search: &SearchArgs) -> Result<Vec<Block>, String> {
        let miner = self.build_miner(search);
        let mut chain: Vec<Block> = Vec::new();

        for offset in 0..length {
            let timestamp = self.default_timestamp + offset;
            let mut block = match chain.last() {
                Some(prev) => prev.next(timestamp)?,
                None => Block::genesis(timestamp),
            };
            self.run_search(&miner, &mut block, search)?;
            log::info!("Chain height {}: {}", block.header.index, block);
            chain.push(block);
        }

        Ok(chain)
    }

    /// Rebuild a mined block from command line fields
    pub fn solved_block(&self, header: &HeaderArgs, nonce: u64, hash: &str) -> Result<Block, String> {
        let mut block = Block {
            header: self.build_header(header),
            hash: None,
        };
        block.apply_solution(nonce, HexDigest::from_hex(hash)?);
        Ok(block)
    }

    /// Encode a mined block together with its search statistics
    pub fn mined_json(&self, block: &Block, result: &MiningResult) -> Result<String, String> {
        serde_json::to_string_pretty(&MinedOutput { block, result })
            .map_err(|e| format!("Failed to encode block: {}", e))
    }

    /// Decode a block from `mine --json` output or a bare block document
    pub fn load_block(&self, json: &str) -> Result<Block, String> {
        let input: BlockInput =
            serde_json::from_str(json).map_err(|e| format!("Invalid block JSON: {}", e))?;
        Ok(match input {
            BlockInput::Mined { block } | BlockInput::Bare(block) => block,
        })
    }

    /// Check a block against a difficulty
    pub fn verify_block(&self, block: &Block, difficulty: usize) -> Result<bool, String> {
        Miner::new(difficulty).verify(block).map_err(|e| e.to_string())
    }

    /// Print mining outcome
    fn print_result(&self, block: &Block, result: &MiningResult) {
        println!("✓ Block mined");
        println!("  Index: {}", block.header.index);
        println!("  Timestamp: {}", block.header.timestamp);
        println!("  Previous: {}", block.header.previous_hash);
        println!("  Nonce: {}", result.nonce);
        println!("  Hash: {}", result.hash);
        println!("  Attempts: {}", result.attempts);
        println!("  Workers: {}", result.workers);
        println!("  Duration: {:?}", result.duration);
        println!("  Hash rate: {:.2} H/s", result.hash_rate());
    }
}

// Tables are created in dependency order: blocks <- transactions <- logs.
pub const CREATE_TABLES: [(&str, &str); 3] = [
    (
        "blocks",
        "CREATE TABLE IF NOT EXISTS blocks (
            number INTEGER PRIMARY KEY,
            hash TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            difficulty TEXT NOT NULL,
            gasLimit INTEGER NOT NULL,
            gasUsed INTEGER NOT NULL,
            contractTxCount INTEGER NOT NULL DEFAULT 0
        )",
    ),
    (
        "transactions",
        "CREATE TABLE IF NOT EXISTS transactions (
            hash TEXT PRIMARY KEY,
            blockNumber INTEGER NOT NULL,
            fromAddress TEXT NOT NULL,
            toAddress TEXT,
            value TEXT NOT NULL,
            gasPrice TEXT NOT NULL,
            gasUsed INTEGER NOT NULL,
            isContractRelated BOOLEAN NOT NULL DEFAULT 0,
            FOREIGN KEY (blockNumber) REFERENCES blocks(number)
        )",
    ),
    (
        "logs",
        "CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transactionHash TEXT NOT NULL,
            address TEXT NOT NULL,
            topics TEXT NOT NULL,
            data TEXT NOT NULL,
            isTargetContract BOOLEAN NOT NULL DEFAULT 0,
            FOREIGN KEY (transactionHash) REFERENCES transactions(hash)
        )",
    ),
];

pub const INSERT_BLOCK: &str = "INSERT INTO blocks \
    (number, hash, timestamp, difficulty, gasLimit, gasUsed, contractTxCount) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

pub const INSERT_TRANSACTION: &str = "INSERT INTO transactions \
    (hash, blockNumber, fromAddress, toAddress, value, gasPrice, gasUsed, isContractRelated) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)";

pub const INSERT_LOG: &str = "INSERT INTO logs \
    (transactionHash, address, topics, data, isTargetContract) \
    VALUES (?, ?, ?, ?, ?)";

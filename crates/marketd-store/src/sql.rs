//! Dialect statement sets.
//!
//! The MySQL and PostgreSQL variants differ only in parameter placeholders
//! and identifier case.

pub mod mysql {
    /// Active pairs for the subscription supervisor.
    pub const ACTIVE_PAIRS_FOR_DATA_MONITOR: &str = r#"
        SELECT
            e.ID,
            LOWER(e.NAME),
            stp.ID,
            COALESCE(stp.SYMBOL, CONCAT(stp.BASE_CURRENCY, stp.QUOTE_CURRENCY)),
            stp.MARKET_TYPE
        FROM
            (
             SELECT
                 DISTINCT(msa.PAIR_ID) AS PAIR_ID
             FROM
                 MONITORING m
             INNER JOIN
                 MONITORING_SPOT_ARRAYS msa
                        ON m.ID = msa.MONITOR_ID
             WHERE
                 m.ACTIVE = 1
            ) t
        INNER JOIN
            SPOT_TRADE_PAIR stp
                ON t.PAIR_ID = stp.ID
        INNER JOIN EXCHANGE e
            ON e.ID = stp.EXCHANGE_ID
        WHERE
            e.ACTIVE = 1
        ORDER BY
            e.ID ASC"#;

    /// Exchange connection record lookup by name.
    pub const EXCHANGE_BY_NAME: &str = r#"
        SELECT ID, NAME, BASE_URL, WEBSOCKET_URL
        FROM EXCHANGE
        WHERE LOWER(NAME) = LOWER(?) AND ACTIVE = 1 AND DELETED = 0"#;

    /// Pairs monitored by the price sampler.
    pub const MONITORING_PAIRS: &str = r#"
        SELECT
            stp.EXCHANGE_ID,
            t.PAIR_ID,
            e.NAME
        FROM
            (
             SELECT
                 DISTINCT(msa.PAIR_ID) AS PAIR_ID
             FROM
                 MONITORING m
             INNER JOIN
                 MONITORING_SPOT_ARRAYS msa
                        ON m.ID = msa.MONITOR_ID
             WHERE
                 ACTIVE = 1
            ) t
        INNER JOIN
            SPOT_TRADE_PAIR stp
                ON t.PAIR_ID = stp.ID
        LEFT JOIN EXCHANGE e
            ON e.ID = stp.EXCHANGE_ID
        WHERE
            e.ACTIVE = 1
        ORDER BY
            EXCHANGE_ID ASC"#;

    /// Price snapshot insert, 23 columns.
    pub const INSERT_PRICE_ROW: &str = r#"
        INSERT INTO PRICE_SPOT_LOG (
            DATE,
            PRICE_TIMESTAMP,
            PAIR_ID,
            ASKS5_PRICE, ASKS5_VOLUME, ASKS4_PRICE, ASKS4_VOLUME, ASKS3_PRICE, ASKS3_VOLUME,
            ASKS2_PRICE, ASKS2_VOLUME, ASKS1_PRICE, ASKS1_VOLUME,
            BIDS1_PRICE, BIDS1_VOLUME, BIDS2_PRICE, BIDS2_VOLUME, BIDS3_PRICE, BIDS3_VOLUME,
            BIDS4_PRICE, BIDS4_VOLUME, BIDS5_PRICE, BIDS5_VOLUME
        ) VALUES(?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)"#;
}

pub mod postgres {
    /// Active pairs for the subscription supervisor.
    pub const ACTIVE_PAIRS_FOR_DATA_MONITOR: &str = r#"
        SELECT
            e.id,
            LOWER(e.name),
            stp.id,
            COALESCE(stp.symbol, stp.base_currency || stp.quote_currency),
            stp.market_type
        FROM
            (
             SELECT
                 DISTINCT(msa.pair_id) AS pair_id
             FROM
                 monitoring m
             INNER JOIN
                 monitoring_spot_arrays msa
                        ON m.id = msa.monitor_id
             WHERE
                 m.active = 1
            ) t
        INNER JOIN
            spot_trade_pair stp
                ON t.pair_id = stp.id
        INNER JOIN exchange e
            ON e.id = stp.exchange_id
        WHERE
            e.active = 1
        ORDER BY
            e.id ASC"#;

    /// Exchange connection record lookup by name.
    pub const EXCHANGE_BY_NAME: &str = r#"
        SELECT id, name, base_url, websocket_url
        FROM exchange
        WHERE LOWER(name) = LOWER($1) AND active = 1 AND deleted = false"#;

    /// Pairs monitored by the price sampler.
    pub const MONITORING_PAIRS: &str = r#"
        SELECT
            stp.exchange_id,
            t.pair_id,
            e.name
        FROM
            (
             SELECT
                 DISTINCT(msa.pair_id) AS pair_id
             FROM
                 monitoring m
             INNER JOIN
                 monitoring_spot_arrays msa
                        ON m.id = msa.monitor_id
             WHERE
                 active = 1
            ) t
        INNER JOIN
            spot_trade_pair stp
                ON t.pair_id = stp.id
        LEFT JOIN exchange e
            ON e.id = stp.exchange_id
        WHERE
            e.active = 1
        ORDER BY
            exchange_id ASC"#;

    /// Price snapshot insert, 23 columns.
    pub const INSERT_PRICE_ROW: &str = r#"
        INSERT INTO price_spot_log (
            date,
            price_timestamp,
            pair_id,
            asks5_price, asks5_volume, asks4_price, asks4_volume, asks3_price, asks3_volume,
            asks2_price, asks2_volume, asks1_price, asks1_volume,
            bids1_price, bids1_volume, bids2_price, bids2_volume, bids3_price, bids3_volume,
            bids4_price, bids4_volume, bids5_price, bids5_volume
        ) VALUES($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,$20,$21,$22,$23)"#;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_insert_statements_have_23_parameters() {
        assert_eq!(super::mysql::INSERT_PRICE_ROW.matches('?').count(), 23);
        assert!(super::postgres::INSERT_PRICE_ROW.contains("$23"));
        assert!(!super::postgres::INSERT_PRICE_ROW.contains("$24"));
    }

    #[test]
    fn test_monitoring_pairs_dialects_differ_only_in_case() {
        assert_eq!(
            super::mysql::MONITORING_PAIRS.to_lowercase(),
            super::postgres::MONITORING_PAIRS.to_lowercase()
        );
    }
}

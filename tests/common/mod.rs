//! Synthetic Superstore fixtures shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Segment,Country,City,State,Postal Code,Region,Product ID,Category,Sub-Category,Sales,Quantity,Discount,Profit";

const SHIP_MODES: [&str; 4] = ["Standard Class", "Second Class", "First Class", "Same Day"];
const SEGMENTS: [&str; 3] = ["Consumer", "Corporate", "Home Office"];
const CITIES: [(&str, &str, u32, &str); 4] = [
    ("Henderson", "Kentucky", 42420, "South"),
    ("Los Angeles", "California", 90036, "West"),
    ("Fort Lauderdale", "Florida", 33311, "South"),
    ("Seattle", "Washington", 98103, "West"),
];
const PRODUCTS: [(&str, &str, &str); 3] = [
    ("FUR", "Furniture", "Bookcases"),
    ("OFF", "Office Supplies", "Binders"),
    ("TEC", "Technology", "Phones"),
];
const DISCOUNTS: [f64; 4] = [0.0, 0.2, 0.45, 0.7];

/// One CSV line for record `i` with the given profit
pub fn record(i: usize, profit: f64) -> String {
    let (city, state, postal, region) = CITIES[i % 4];
    let (prefix, category, sub_category) = PRODUCTS[i % 3];
    let day = 1 + i % 24;
    let month = 1 + i % 12;
    let year = 2014 + i % 4;

    format!(
        "CA-{}-{:06},{}/{}/{},{}/{}/{},{},CG-{},{},United States,{},{},{},{},{}-BO-{},{},{},{:.2},{},{},{:.4}",
        year,
        i,
        month,
        day,
        year,
        month,
        day + i % 5,
        year,
        SHIP_MODES[i % 4],
        10_000 + i % 15,
        SEGMENTS[i % 3],
        city,
        state,
        postal,
        region,
        prefix,
        1_000 + i % 7,
        category,
        sub_category,
        20.5 + ((i * 37) % 200) as f64,
        1 + i % 9,
        DISCOUNTS[i % 4],
        profit,
    )
}

/// `n` records, the first `positive` with strictly positive profit
pub fn records(n: usize, positive: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let profit = if i < positive {
                5.0 + i as f64 * 1.5
            } else if i % 10 == 0 {
                0.0
            } else {
                -(2.0 + i as f64)
            };
            record(i, profit)
        })
        .collect()
}

pub fn write_csv(dir: &Path, header: &str, lines: &[String]) -> PathBuf {
    let path = dir.join("superstore.csv");
    let mut content = String::from(header);
    content.push('\n');
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

/// Drop one column from a header and its records
pub fn without_column(header: &str, lines: &[String], column: &str) -> (String, Vec<String>) {
    let names: Vec<&str> = header.split(',').collect();
    let idx = names.iter().position(|n| *n == column).unwrap();

    let strip = |line: &str| {
        line.split(',')
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .map(|(_, v)| v)
            .collect::<Vec<_>>()
            .join(",")
    };
    (strip(header), lines.iter().map(|l| strip(l)).collect())
}

/// Replace field `index` of a CSV line
pub fn with_field(line: &str, index: usize, value: &str) -> String {
    let mut fields: Vec<&str> = line.split(',').collect();
    fields[index] = value;
    fields.join(",")
}

#![allow(dead_code)]

use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::fs::File;
use std::path::PathBuf;
use tempfile::TempDir;

pub const REGIONS: [&str; 3] = ["E", "E", "W"];
pub const YEARS: [i64; 3] = [2023, 2024, 2023];
pub const SALES: [i64; 3] = [10, 20, 5];

pub fn sales_frame() -> DataFrame {
    df!(
        "region" => REGIONS,
        "year" => YEARS,
        "sales" => SALES
    )
    .unwrap()
}

/// A wider dataset: four regions, three years, two reps, some gaps.
pub fn ledger_frame() -> DataFrame {
    let regions = ["N", "S", "E", "W"];
    let mut region = Vec::new();
    let mut year = Vec::new();
    let mut rep = Vec::new();
    let mut amount = Vec::new();
    for i in 0..40i64 {
        // Skip some combinations so the pivot has empty cells.
        if i % 7 == 3 {
            continue;
        }
        region.push(regions[(i % 4) as usize]);
        year.push(2021 + (i % 3));
        rep.push(if i % 2 == 0 { "ann" } else { "bob" });
        amount.push(i * 13 % 97 + 1);
    }
    df!(
        "region" => region,
        "year" => year,
        "rep" => rep,
        "amount" => amount
    )
    .unwrap()
}

pub fn write_csv(dir: &TempDir, name: &str, df: &DataFrame) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = File::create(&path).unwrap();
    let mut df = df.clone();
    CsvWriter::new(&mut file).finish(&mut df).unwrap();
    path
}

pub fn write_parquet(dir: &TempDir, name: &str, df: &DataFrame) -> PathBuf {
    let path = dir.path().join(name);
    let file = File::create(&path).unwrap();
    let mut df = df.clone();
    ParquetWriter::new(file).finish(&mut df).unwrap();
    path
}

/// Workbook with two sheets holding the sales rows:
/// - "Q1": a title in row 0, a blank row 1, the header in row 2;
/// - "Q2": the header in row 1 with nothing above it.
pub fn write_sales_workbook(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("sales.xlsx");
    let mut workbook = Workbook::new();

    let q1 = workbook.add_worksheet();
    q1.set_name("Q1").unwrap();
    q1.write_string(0, 0, "Sales by region").unwrap();
    write_sales_block(q1, 2);

    let q2 = workbook.add_worksheet();
    q2.set_name("Q2").unwrap();
    write_sales_block(q2, 1);

    workbook.save(&path).unwrap();
    path
}

fn write_sales_block(sheet: &mut rust_xlsxwriter::Worksheet, header_row: u32) {
    sheet.write_string(header_row, 0, "region").unwrap();
    sheet.write_string(header_row, 1, "year").unwrap();
    sheet.write_string(header_row, 2, "sales").unwrap();
    for i in 0..REGIONS.len() {
        let row = header_row + 1 + i as u32;
        sheet.write_string(row, 0, REGIONS[i]).unwrap();
        sheet.write_number(row, 1, YEARS[i] as f64).unwrap();
        sheet.write_number(row, 2, SALES[i] as f64).unwrap();
    }
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

pub fn text_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}

pub fn int_column(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name).unwrap().i64().unwrap().into_iter().collect()
}

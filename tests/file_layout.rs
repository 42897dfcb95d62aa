// End-to-end checks of the on-disk layout written through `Table`.
use rfk::{Cell, Header, Row, Table, HEADER_PREFIX_SIZE, MAGIC, VERSION};
use std::io::Cursor;

#[test]
fn file_bytes_match_documented_layout() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("layout.rfk");

    let mut table = Table::create(&path, "(id:int tag:string)")?;
    table.append("(7 && ok)")?;
    drop(table);

    let bytes = std::fs::read(&path)?;
    let mut expected = Vec::new();
    expected.extend_from_slice(&MAGIC);
    expected.push(VERSION);
    expected.extend_from_slice(&1u32.to_be_bytes()); // rows
    expected.extend_from_slice(&2u32.to_be_bytes()); // columns
    expected.extend_from_slice(&[0, 2, b'i', b'd', 0]);
    expected.extend_from_slice(&[0, 3, b't', b'a', b'g', 2]);
    expected.extend_from_slice(&[0, 0, 0, 0, 7]);
    expected.extend_from_slice(&[2, 0, 0, 0, 2, b'o', b'k']);
    assert_eq!(bytes, expected);
    Ok(())
}

#[test]
fn header_and_rows_decode_from_raw_file() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("people.rfk");

    let mut table = Table::create(&path, "(age:int name:string score:float)")?;
    for (age, name, score) in [(30, "Alice", "95.5"), (41, "Bob", "70.25"), (5, "Cy", "0.5")] {
        table.append(&format!("({age} && {name} && {score})"))?;
    }
    drop(table);

    let bytes = std::fs::read(&path)?;
    let mut cursor = Cursor::new(bytes);
    let header = Header::read_from(&mut cursor)?;
    assert_eq!(header.num_rows(), 3);
    assert!(cursor.position() as usize >= HEADER_PREFIX_SIZE);

    let mut ages = Vec::new();
    for _ in 0..header.num_rows() {
        let row = Row::read_from(&mut cursor, &header)?;
        assert!(row.conforms_to(&header));
        if let Some(Cell::Int(age)) = row.get(0) {
            ages.push(*age);
        }
    }
    assert_eq!(ages, vec![30, 41, 5]);
    assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    Ok(())
}

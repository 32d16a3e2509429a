use crate::features::bills::models::{Bill, BillView, NO_ATTACHMENT};
use chrono::{DateTime, NaiveDate};

/// 日付文字列を表示形（YY年M月D日）に変換する
///
/// 全域関数であり決してパニックしない。解析できない場合は
/// 警告ログを残して元の文字列をそのまま返す（レコードは落とさない）
///
/// # 引数
/// * `raw` - 保存されている日付文字列
///
/// # 戻り値
/// 表示形の日付、または解析不能時は入力そのもの
pub fn format_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => {
            use chrono::Datelike;
            format!(
                "{:02}年{}月{}日",
                date.year() % 100,
                date.month(),
                date.day()
            )
        }
        None => {
            log::warn!("日付の解析に失敗したため元の値を表示します: {raw}");
            raw.to_string()
        }
    }
}

/// 日付文字列の解析を試みる（ISO日付またはRFC3339タイムスタンプ）
fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }

    None
}

/// ステータスの内部値を表示ラベルに変換する
///
/// 未知の値はそのまま通す
pub fn format_status(raw: &str) -> String {
    match raw {
        "pending" => "申請中".to_string(),
        "accepted" => "承認済み".to_string(),
        "refused" => "却下".to_string(),
        other => other.to_string(),
    }
}

/// 表示用の並び順（日付降順）に安定ソートする
///
/// 各レコードに比較キーを一つだけ与えるので全順序になる:
/// 解析できた日付同士は日付の降順（同日は元の文字列の降順）、
/// 解析できない日付はそれらの後ろに元の文字列の降順で並ぶ。
/// 入力順によらず同じ並びに定まり、決してパニックしない
pub fn sort_for_display(mut bills: Vec<Bill>) -> Vec<Bill> {
    bills.sort_by(|a, b| {
        match (parse_date(&a.date), parse_date(&b.date)) {
            (Some(da), Some(db)) => db.cmp(&da).then_with(|| b.date.cmp(&a.date)),
            // 解析できた日付が常に先
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.date.cmp(&a.date),
        }
    });
    bills
}

/// ストレージ内パスから公開アクセスURLを導出する純粋関数
///
/// # 引数
/// * `file_path` - 保存されているパス（番兵値の場合もある）
/// * `public_base` - ストレージの公開ベースURL
///
/// # 戻り値
/// - 番兵値または空文字列ならNone
/// - 既に絶対URLならそのまま
/// - それ以外はベースURLと結合したURL
pub fn file_url(file_path: &str, public_base: &str) -> Option<String> {
    if file_path.is_empty() || file_path == NO_ATTACHMENT {
        return None;
    }

    if file_path.starts_with("http") {
        return Some(file_path.to_string());
    }

    Some(format!(
        "{}/{}",
        public_base.trim_end_matches('/'),
        file_path.trim_start_matches('/')
    ))
}

/// 永続化レコードを表示用に正規化する
///
/// 読み取り系の応答はこの関数をちょうど一度だけ通る
///
/// # 引数
/// * `bill` - 永続化された申請レコード
/// * `public_base` - ストレージの公開ベースURL
pub fn present(bill: &Bill, public_base: &str) -> BillView {
    BillView {
        id: bill.key.clone(),
        email: bill.email.clone(),
        name: bill.name.clone(),
        bill_type: bill.bill_type.clone(),
        date: format_date(&bill.date),
        amount: bill.amount,
        vat: bill.vat.clone(),
        pct: bill.pct,
        commentary: bill.commentary.clone(),
        status: format_status(&bill.status),
        comment_admin: bill.comment_admin.clone(),
        file_name: bill.file_name.clone(),
        file_url: file_url(&bill.file_path, public_base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    const BASE: &str = "http://127.0.0.1:5678/public";

    fn bill_with_date(key: &str, date: &str) -> Bill {
        Bill {
            key: key.to_string(),
            email: "e@x.com".to_string(),
            name: String::new(),
            bill_type: String::new(),
            date: date.to_string(),
            amount: 0,
            vat: String::new(),
            pct: 20,
            commentary: String::new(),
            status: "pending".to_string(),
            comment_admin: String::new(),
            file_name: NO_ATTACHMENT.to_string(),
            file_path: NO_ATTACHMENT.to_string(),
        }
    }

    #[test]
    fn test_format_date_valid() {
        assert_eq!(format_date("2021-01-01"), "21年1月1日");
        assert_eq!(format_date("2004-04-04"), "04年4月4日");
        // RFC3339タイムスタンプも日付として扱う
        assert_eq!(format_date("2021-12-31T10:00:00+09:00"), "21年12月31日");
    }

    #[test]
    fn test_format_date_invalid_returns_input() {
        // 解析不能な入力は加工せずそのまま返す
        assert_eq!(format_date("not-a-date"), "not-a-date");
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("2021/01/01"), "2021/01/01");
    }

    #[test]
    fn test_format_status() {
        assert_eq!(format_status("pending"), "申請中");
        assert_eq!(format_status("accepted"), "承認済み");
        assert_eq!(format_status("refused"), "却下");
        // 未知の値はそのまま通す
        assert_eq!(format_status("archived"), "archived");
    }

    #[test]
    fn test_sort_for_display_descending() {
        let bills = vec![
            bill_with_date("a", "2021-01-01"),
            bill_with_date("b", "2021-12-31"),
            bill_with_date("c", "2021-06-15"),
        ];

        let sorted = sort_for_display(bills);
        let keys: Vec<&str> = sorted.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_sort_keeps_unparsable_dates() {
        // 解析不能な日付のレコードも結果から脱落しない
        let bills = vec![
            bill_with_date("a", "not-a-date"),
            bill_with_date("b", "2021-04-01"),
            bill_with_date("c", "invalid"),
        ];

        let sorted = sort_for_display(bills);
        assert_eq!(sorted.len(), 3);

        let dates: Vec<&str> = sorted.iter().map(|b| b.date.as_str()).collect();
        assert!(dates.contains(&"not-a-date"));
        assert!(dates.contains(&"2021-04-01"));
        assert!(dates.contains(&"invalid"));
    }

    #[test]
    fn test_sort_order_is_input_independent() {
        // ゼロ詰めなしの日付も解析されるため、日付順と文字列順が
        // 食い違う組でも入力順によらず同じ並びに定まること
        let dates = ["2021-10-01", "2021-9-30", "2021-5"];
        let permutations = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];

        for order in permutations {
            let bills: Vec<Bill> = order
                .iter()
                .map(|&i| bill_with_date(&format!("k{i}"), dates[i]))
                .collect();

            let sorted = sort_for_display(bills);
            let result: Vec<&str> = sorted.iter().map(|b| b.date.as_str()).collect();
            // 解析できた日付が降順で先、解析できないものは後ろ
            assert_eq!(result, vec!["2021-10-01", "2021-9-30", "2021-5"]);
        }
    }

    #[test]
    fn test_sort_is_idempotent() {
        let bills = vec![
            bill_with_date("a", "not-a-date"),
            bill_with_date("b", "2021-04-01"),
            bill_with_date("c", "invalid"),
            bill_with_date("d", "2020-01-01"),
        ];

        let once = sort_for_display(bills);
        let twice = sort_for_display(once.clone());
        let once_keys: Vec<&str> = once.iter().map(|b| b.key.as_str()).collect();
        let twice_keys: Vec<&str> = twice.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(once_keys, twice_keys);
    }

    #[test]
    fn test_file_url_sentinel_and_empty() {
        assert_eq!(file_url(NO_ATTACHMENT, BASE), None);
        assert_eq!(file_url("", BASE), None);
    }

    #[test]
    fn test_file_url_absolute_passthrough() {
        let absolute = "https://storage.example.com/bucket/receipt.png";
        assert_eq!(file_url(absolute, BASE), Some(absolute.to_string()));
    }

    #[test]
    fn test_file_url_relative_joined() {
        assert_eq!(
            file_url("receipt.png", BASE),
            Some("http://127.0.0.1:5678/public/receipt.png".to_string())
        );
        // ベースURL末尾やパス先頭のスラッシュが重複しないこと
        assert_eq!(
            file_url("/receipt.png", "http://127.0.0.1:5678/public/"),
            Some("http://127.0.0.1:5678/public/receipt.png".to_string())
        );
    }

    #[test]
    fn test_present_normalizes_once() {
        let mut bill = bill_with_date("k1", "2021-01-01");
        bill.status = "accepted".to_string();
        bill.file_path = "receipt.png".to_string();

        let view = present(&bill, BASE);
        assert_eq!(view.id, "k1");
        assert_eq!(view.date, "21年1月1日");
        assert_eq!(view.status, "承認済み");
        assert_eq!(
            view.file_url,
            Some("http://127.0.0.1:5678/public/receipt.png".to_string())
        );
    }

    #[quickcheck]
    fn prop_format_date_never_panics(raw: String) -> bool {
        // 全域性: どんな入力でも文字列が返る（解析不能なら入力そのもの）
        let rendered = format_date(&raw);
        rendered == raw || !rendered.is_empty()
    }

    #[quickcheck]
    fn prop_sort_preserves_records(dates: Vec<String>) -> bool {
        let bills: Vec<Bill> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| bill_with_date(&format!("k{i}"), d))
            .collect();

        let sorted = sort_for_display(bills);
        sorted.len() == dates.len()
    }

    #[quickcheck]
    fn prop_sort_is_idempotent(dates: Vec<String>) -> bool {
        let bills: Vec<Bill> = dates
            .iter()
            .enumerate()
            .map(|(i, d)| bill_with_date(&format!("k{i}"), d))
            .collect();

        let once = sort_for_display(bills);
        let once_keys: Vec<String> = once.iter().map(|b| b.key.clone()).collect();
        let twice = sort_for_display(once);
        let twice_keys: Vec<String> = twice.iter().map(|b| b.key.clone()).collect();
        once_keys == twice_keys
    }
}

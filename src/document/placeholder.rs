//! Placeholder Replacement
//!
//! 文書全体（本文・表・ヘッダー・フッター）のプレースホルダーを置換・削除します。

use tracing::{debug, trace};

use super::text::{for_each_paragraph_mut, replace_in_paragraph};
use super::PlanDocument;

impl PlanDocument {
    /// プレースホルダーを値で置き換える
    ///
    /// 本文・表のセル・ヘッダー・フッターのすべての段落を走査し、
    /// `token`のすべての出現を置き換えます。`value`が`None`または空文字列の
    /// 場合はトークンを削除します。トークンが見つからない場合は何もしません。
    ///
    /// # 引数
    ///
    /// * `token` - 置換するトークン（例: `<<DOB>>`）
    /// * `value` - 置換後の値
    ///
    /// # 戻り値
    ///
    /// 置き換えた出現回数
    pub fn apply(&mut self, token: &str, value: Option<&str>) -> usize {
        let replacement = value.unwrap_or("");
        let mut total = 0;

        for part in self.parts.iter_mut() {
            let Some(root) = part.tree.root_mut() else {
                continue;
            };
            let mut count = 0;
            for_each_paragraph_mut(root, &mut |paragraph| {
                count += replace_in_paragraph(paragraph, token, replacement);
            });
            if count > 0 {
                trace!(part = %part.name, token, count, "Token replaced in part");
            }
            total += count;
        }

        if total > 0 {
            if replacement.is_empty() {
                debug!(token, occurrences = total, "Placeholder removed");
            } else {
                debug!(token, occurrences = total, "Placeholder filled");
            }
        }
        total
    }

    /// 複数のプレースホルダーを順に置き換える
    ///
    /// # 戻り値
    ///
    /// 置き換えた出現回数の合計
    pub fn apply_all<'a, I>(&mut self, bindings: I) -> usize
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        bindings
            .into_iter()
            .map(|(token, value)| self.apply(token, value))
            .sum()
    }
}

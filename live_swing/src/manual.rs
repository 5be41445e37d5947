/*!

This is the long-form manual for `live_swing` and `liveswing`.

## Running a projection

```bash
liveswing --current current.json -p previous.json -c config.json -o projection.json
```

Options:
* `--current` the results of the election being counted
* `-p` / `--previous` the complete results of the previous election
* `-c` / `--config` the project configuration
* `-o` / `--out` where to write the projection (standard output by default)
* `-d` / `--diagnostics` where to write the seat by seat, booth by booth report
* `-r` / `--reference` a previously computed projection. The program fails and prints
  the differences if the new projection does not match it.
* `--verbose` debug logging

## Pipeline

Each run goes through the following stages, always in this order:

1. **Seat matching.** Every seat is paired with a seat of the previous election with the
   same id, else the same name, else its configured `previousName`, else its configured
   `alternateName`. Booths are paired by id, then by name within the matched seats.
   Independent candidates are paired by name, the others by party.
2. **Preference flows.** For every party slot, the share of its first preferences that flows
   to the first major party. The flows are fitted by weighted least squares on the booths
   whose two-candidate count has a major party on one side, a known party or an independent
   on the other, and at most one coalition member. The two majors are anchored at 100 and 0,
   and each other slot is pulled towards its configured `preferenceFlow`.
3. **Swings.** Booth by booth first preference swings (raw and logit-transformed) and
   two-candidate swings, aggregated to the seat weighted by the current booth votes.
4. **Two-party estimates.** Booths without a usable two-candidate swing get an estimated
   two-party figure from their first preferences and the fitted flows.
5. **Count progress.** Counted votes as a percentage of the enrolment.
6. **Declaration votes.** The volume and the swing of the absent, provisional, pre-poll,
   postal and early votes still to come, mixed into a final seat swing.
7. **Pre-poll bias.** The difference between the swings of the pre-poll voting centres and
   of the normal booths, nationally and for each seat.

The output is a JSON document with one entry per configured seat, in the order of the
configuration.

## Configuration

```json
{
  "parties": [
    {"name": "Labor", "officialCodes": ["ALP"]},
    {"name": "Coalition", "officialCodes": ["LP", "LNP", "NP"]},
    {"name": "Greens", "officialCodes": ["GRN"], "preferenceFlow": 82.0, "regressionGroup": "left"}
  ],
  "coalitionPartnerCodes": ["NP"],
  "othersCodes": ["UAP"],
  "defaultPreferenceFlow": 50.0,
  "seats": [
    {"name": "Cowper", "previousName": "Page", "emergingIndependents": ["Caz Heise"],
     "declarationOverrides": {"postal": {"count": 12000}, "prePoll": {"percent": 4.5}}}
  ],
  "settings": {"transformedSwingCap": 3.0}
}
```

The first two parties are the major parties. Their order matters: all the two-party
figures are expressed from the point of view of the first one. Parties sharing a
`regressionGroup` are fitted as a single preference flow.

The `settings` object is optional, as are all its fields:
* `transformedSwingCap` (default 3.0) the transformed swing is capped at this multiple
  of the raw swing
* `votesPerRegressionRow` (default 100)
* `anchorWeight` (default 1e7) and `priorWeight` (default 50)
* `coalitionSiblingFlow` (default 20)
* `unknownFlow` (default 50)

## Snapshots

Both the current and the previous elections are described with the same format:

```json
{
  "name": "2022 federal",
  "parties": [{"id": 1, "name": "Australian Labor Party", "shortCode": "ALP"}],
  "candidates": [{"id": 10, "name": "Mary Doyle", "party": 1}, {"id": 12, "name": "Jo Bloggs"}],
  "seats": [{
    "id": 100, "name": "Aston", "enrolment": 110000,
    "booths": [{"id": 1000, "name": "Boronia", "kind": "normal",
                "fp": {"10": 400}, "tcp": {"1": 480, "-1": 520}}],
    "fp": [{"candidate": 10, "voteType": "postal", "votes": 50}],
    "tcp": [{"party": 1, "voteType": "postal", "votes": 40}]
  }]
}
```

Candidates without a `party` are independents. In the two-candidate counts, they are
referred to with the party id `-1`.

Booth votes are ordinary votes: they are added to the ordinary votes of the seat. The
seat level `fp` and `tcp` lists hold the votes counted outside of the booths, with one of the
vote types `ordinary`, `absent`, `provisional`, `prePoll`, `postal` or `early`.

Booth kinds: `normal` (default), `ppvc` (or `earlyVotingCentre`), `remote`, `hospital`,
`prison`, `other`.

*/
